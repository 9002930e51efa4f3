//! Vector to raster export
//!
//! Converts a rendered SVG into a PNG at a fixed target width. The height
//! always follows from the graphic's aspect ratio.
//!
//! # Pipeline
//!
//! ```text
//! markup ──▶ duplicate with width/height rewritten ──▶ data:image/svg+xml
//!        ──▶ usvg tree ──▶ pixmap (background fill, then draw) ──▶ PNG
//! ```
//!
//! The displayed markup is never touched; every export works on its own
//! copy, so exports may run concurrently.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::{ConversionError, ConversionResult};
use crate::theme::{parse_color, ThemeConfiguration};

/// Export width used by the click affordance
pub const DEFAULT_TARGET_WIDTH: u32 = 3600;

const SVG_MIME: &str = "image/svg+xml";
const PNG_MIME: &str = "image/png";

/// Width and height in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    /// Create a size
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True if both sides are finite and positive
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Snapshot of a displayed vector graphic
#[derive(Debug, Clone, PartialEq)]
pub struct VectorGraphic {
    markup: String,
    fallback_size: Option<Size>,
}

impl VectorGraphic {
    /// Wrap SVG markup
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            fallback_size: None,
        }
    }

    /// Attach the on-screen size used when the markup has no view box
    pub fn with_fallback_size(mut self, size: Option<Size>) -> Self {
        self.fallback_size = size;
        self
    }

    /// The SVG markup
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// The on-screen size, if known
    pub fn fallback_size(&self) -> Option<Size> {
        self.fallback_size
    }
}

/// Exported PNG image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// PNG bytes
    pub png: Vec<u8>,
}

impl RasterImage {
    /// MIME type of the encoded image
    pub fn mime_type(&self) -> &'static str {
        PNG_MIME
    }

    /// Self-describing `data:` reference for the image
    pub fn to_data_url(&self) -> String {
        encode_data_url(PNG_MIME, &self.png)
    }

    /// Check if the data appears to be a valid PNG
    pub fn is_valid_png(&self) -> bool {
        self.png.len() >= 8 && &self.png[0..8] == b"\x89PNG\r\n\x1a\n"
    }
}

/// Build a base64 `data:` reference
pub fn encode_data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}

/// Decode a base64 `data:` reference of the given MIME type
pub fn decode_data_url(url: &str, mime: &str) -> ConversionResult<Vec<u8>> {
    let payload = url
        .strip_prefix("data:")
        .and_then(|rest| rest.strip_prefix(mime))
        .and_then(|rest| rest.strip_prefix(";base64,"))
        .ok_or_else(|| ConversionError::Decode(format!("not a base64 {} data reference", mime)))?;

    STANDARD
        .decode(payload.trim())
        .map_err(|e| ConversionError::Decode(e.to_string()))
}

/// Converts rendered vector graphics to PNG
///
/// Holds no per-export state; cloning is cheap and clones share the font
/// database.
#[derive(Clone)]
pub struct RasterExporter {
    target_width: u32,
    background: tiny_skia::Color,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl std::fmt::Debug for RasterExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterExporter")
            .field("target_width", &self.target_width)
            .field("background", &self.background)
            .field("fonts", &self.fontdb.len())
            .finish()
    }
}

impl RasterExporter {
    /// Create an exporter with system fonts loaded
    pub fn new(target_width: u32, background: tiny_skia::Color) -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();

        if fontdb.is_empty() {
            log::warn!("No system fonts found, exported text may be missing");
        }

        Self::with_fontdb(target_width, background, Arc::new(fontdb))
    }

    /// Create an exporter sharing an existing font database
    pub fn with_fontdb(
        target_width: u32,
        background: tiny_skia::Color,
        fontdb: Arc<usvg::fontdb::Database>,
    ) -> Self {
        Self {
            target_width,
            background,
            fontdb,
        }
    }

    /// Exporter at the default width over the theme background
    pub fn from_theme(theme: &ThemeConfiguration) -> Self {
        let background = parse_color(theme.background()).unwrap_or(tiny_skia::Color::BLACK);
        Self::new(DEFAULT_TARGET_WIDTH, background)
    }

    /// Target width in pixels
    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    /// Background painted under the graphic
    pub fn background(&self) -> tiny_skia::Color {
        self.background
    }

    /// Convert a graphic to PNG on the blocking pool
    pub async fn export(&self, graphic: VectorGraphic) -> ConversionResult<RasterImage> {
        let exporter = self.clone();
        tokio::task::spawn_blocking(move || exporter.to_raster(&graphic))
            .await
            .map_err(|e| ConversionError::Aborted(e.to_string()))?
    }

    /// Convert a graphic to PNG
    pub fn to_raster(&self, graphic: &VectorGraphic) -> ConversionResult<RasterImage> {
        let root = inspect_root(graphic.markup())?;

        // Intrinsic size: declared view region first, on-screen size second
        let (intrinsic, has_view_box) = match root.view_box.filter(Size::is_usable) {
            Some(size) => (size, true),
            None => (
                graphic
                    .fallback_size()
                    .filter(Size::is_usable)
                    .ok_or(ConversionError::MissingDimensions)?,
                false,
            ),
        };

        let target_width = self.target_width;
        let scale = target_width as f32 / intrinsic.width;
        let scaled_height = intrinsic.height * scale;
        let target_height = scaled_height.round().max(1.0) as u32;

        // Without a view box the content would not follow the new size
        let view_box = (!has_view_box).then_some(intrinsic);
        let duplicate = resize_root(
            graphic.markup(),
            Size::new(target_width as f32, scaled_height),
            view_box,
        )?;
        let data_url = encode_data_url(SVG_MIME, duplicate.as_bytes());

        let png = self.draw(&data_url, target_width, target_height)?;
        log::debug!(
            "Exported {}x{} graphic to {}x{} PNG ({} bytes)",
            intrinsic.width,
            intrinsic.height,
            target_width,
            target_height,
            png.len()
        );

        Ok(RasterImage {
            width: target_width,
            height: target_height,
            png,
        })
    }

    /// Decode the serialized graphic and paint it over the background
    fn draw(&self, data_url: &str, width: u32, height: u32) -> ConversionResult<Vec<u8>> {
        let svg = decode_data_url(data_url, SVG_MIME)?;

        let opts = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            shape_rendering: usvg::ShapeRendering::GeometricPrecision,
            text_rendering: usvg::TextRendering::OptimizeLegibility,
            image_rendering: usvg::ImageRendering::OptimizeQuality,
            ..Default::default()
        };
        let tree = usvg::Tree::from_data(&svg, &opts)
            .map_err(|e| ConversionError::Decode(format!("SVG parsing failed: {}", e)))?;

        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or(ConversionError::Surface { width, height })?;

        // Transparent regions must come out as background, not black
        pixmap.fill(self.background);

        let size = tree.size();
        let transform = tiny_skia::Transform::from_scale(
            width as f32 / size.width(),
            height as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        pixmap
            .encode_png()
            .map_err(|e| ConversionError::Encode(e.to_string()))
    }
}

/// Attributes of the root `<svg>` element
#[derive(Debug, Default)]
struct RootInfo {
    view_box: Option<Size>,
    width: Option<f32>,
    height: Option<f32>,
}

/// Size declared by the `width`/`height` attributes of the root element
pub fn declared_size(markup: &str) -> Option<Size> {
    let root = inspect_root(markup).ok()?;
    Some(Size::new(root.width?, root.height?)).filter(Size::is_usable)
}

fn is_svg(element: &BytesStart<'_>) -> bool {
    element.local_name().as_ref() == b"svg"
}

/// Read the first `<svg>` element's sizing attributes
fn inspect_root(markup: &str) -> ConversionResult<RootInfo> {
    let mut reader = Reader::from_str(markup);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if is_svg(&e) => {
                let mut info = RootInfo::default();
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| ConversionError::InvalidMarkup(e.to_string()))?;
                    let value = String::from_utf8_lossy(&attr.value);
                    match attr.key.as_ref() {
                        b"viewBox" => info.view_box = parse_view_box(&value),
                        b"width" => info.width = parse_length(&value),
                        b"height" => info.height = parse_length(&value),
                        _ => {}
                    }
                }
                return Ok(info);
            }
            Ok(Event::Eof) => {
                return Err(ConversionError::InvalidMarkup(
                    "no <svg> element found".to_string(),
                ))
            }
            Ok(_) => {}
            Err(e) => return Err(ConversionError::InvalidMarkup(e.to_string())),
        }
    }
}

/// `min-x min-y width height`, separated by whitespace and/or commas
fn parse_view_box(value: &str) -> Option<Size> {
    let numbers: Vec<f32> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;

    match numbers.as_slice() {
        [_, _, width, height] => Some(Size::new(*width, *height)),
        _ => None,
    }
}

/// Absolute length in user units; percentages are not resolvable here
fn parse_length(value: &str) -> Option<f32> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value);
    number.trim().parse::<f32>().ok().filter(|n| n.is_finite())
}

/// Copy the markup with the root element's size replaced
fn resize_root(markup: &str, size: Size, view_box: Option<Size>) -> ConversionResult<String> {
    let mut reader = Reader::from_str(markup);
    let mut writer = Writer::new(Vec::with_capacity(markup.len() + 64));
    let mut resized = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ConversionError::InvalidMarkup(e.to_string()))?;

        let written = match event {
            Event::Eof => break,
            Event::Start(e) if !resized && is_svg(&e) => {
                resized = true;
                writer.write_event(Event::Start(resize_element(&e, size, view_box)?))
            }
            Event::Empty(e) if !resized && is_svg(&e) => {
                resized = true;
                writer.write_event(Event::Empty(resize_element(&e, size, view_box)?))
            }
            other => writer.write_event(other),
        };
        written.map_err(|e| ConversionError::Serialize(e.to_string()))?;
    }

    if !resized {
        return Err(ConversionError::InvalidMarkup(
            "no <svg> element found".to_string(),
        ));
    }

    String::from_utf8(writer.into_inner()).map_err(|e| ConversionError::Serialize(e.to_string()))
}

fn resize_element(
    element: &BytesStart<'_>,
    size: Size,
    view_box: Option<Size>,
) -> ConversionResult<BytesStart<'static>> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut resized = BytesStart::new(name);

    for attr in element.attributes() {
        let attr = attr.map_err(|e| ConversionError::InvalidMarkup(e.to_string()))?;
        match attr.key.as_ref() {
            b"width" | b"height" => {}
            b"viewBox" if view_box.is_some() => {}
            _ => resized.push_attribute(attr),
        }
    }

    resized.push_attribute(("width", size.width.to_string().as_str()));
    resized.push_attribute(("height", size.height.to_string().as_str()));
    if let Some(view_box) = view_box {
        let value = format!("0 0 {} {}", view_box.width, view_box.height);
        resized.push_attribute(("viewBox", value.as_str()));
    }

    Ok(resized)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: (u8, u8, u8) = (0x1e, 0x1e, 0x1e);

    fn exporter(width: u32) -> RasterExporter {
        let (r, g, b) = BACKGROUND;
        RasterExporter::with_fontdb(
            width,
            tiny_skia::Color::from_rgba8(r, g, b, 255),
            Arc::new(usvg::fontdb::Database::new()),
        )
    }

    fn decode(image: &RasterImage) -> tiny_skia::Pixmap {
        tiny_skia::Pixmap::decode_png(&image.png).unwrap()
    }

    #[test]
    fn test_parse_view_box() {
        assert_eq!(parse_view_box("0 0 400 300"), Some(Size::new(400.0, 300.0)));
        assert_eq!(parse_view_box("-8, -8 116.5,50"), Some(Size::new(116.5, 50.0)));
        assert_eq!(parse_view_box("0 0 400"), None);
        assert_eq!(parse_view_box("a b c d"), None);
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("120"), Some(120.0));
        assert_eq!(parse_length(" 64.5px "), Some(64.5));
        assert_eq!(parse_length("100%"), None);
    }

    #[test]
    fn test_resize_root_rewrites_only_root_size() {
        let markup = r#"<svg xmlns="http://www.w3.org/2000/svg" id="d1" width="100%" viewBox="0 0 40 20"><svg width="5" height="5"/><text>a &lt; b</text></svg>"#;
        let resized = resize_root(markup, Size::new(800.0, 400.0), None).unwrap();

        assert!(resized.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" id="d1" viewBox="0 0 40 20" width="800" height="400">"#));
        // Nested elements and escaped text are copied as-is
        assert!(resized.contains(r#"<svg width="5" height="5"/>"#));
        assert!(resized.contains("a &lt; b"));
    }

    #[test]
    fn test_resize_root_adds_view_box() {
        let markup = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect width="10" height="10"/></svg>"#;
        let resized =
            resize_root(markup, Size::new(100.0, 50.0), Some(Size::new(20.0, 10.0))).unwrap();
        assert!(resized.contains(r#"viewBox="0 0 20 10""#));
    }

    #[test]
    fn test_declared_size() {
        assert_eq!(
            declared_size(r#"<svg width="30" height="15"></svg>"#),
            Some(Size::new(30.0, 15.0))
        );
        assert_eq!(declared_size(r#"<svg viewBox="0 0 30 15"></svg>"#), None);
        assert_eq!(declared_size("not markup"), None);
    }

    #[test]
    fn test_export_preserves_aspect_ratio() {
        let graphic = VectorGraphic::new(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 400 300"><rect width="400" height="300" fill="#ff0000"/></svg>"##,
        );
        let image = exporter(720).to_raster(&graphic).unwrap();

        assert_eq!(image.width, 720);
        assert_eq!(image.height, 540);
        assert!(image.is_valid_png());

        let pixmap = decode(&image);
        assert_eq!((pixmap.width(), pixmap.height()), (720, 540));
    }

    #[test]
    fn test_export_height_rounds_within_one_unit() {
        let graphic = VectorGraphic::new(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 333 100"></svg>"#,
        );
        let image = exporter(1000).to_raster(&graphic).unwrap();
        let expected = 100.0 * 1000.0 / 333.0;
        assert!((image.height as f32 - expected).abs() <= 1.0);
    }

    #[test]
    fn test_transparent_regions_get_background() {
        // Left half red, right half left transparent
        let graphic = VectorGraphic::new(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 50"><rect x="0" y="0" width="50" height="50" fill="#ff0000"/></svg>"##,
        );
        let image = exporter(200).to_raster(&graphic).unwrap();
        let pixmap = decode(&image);

        let (r, g, b) = BACKGROUND;
        for (x, y) in [(150, 50), (199, 0), (120, 99), (101, 10)] {
            let pixel = pixmap.pixel(x, y).unwrap();
            assert_eq!(
                (pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()),
                (r, g, b, 255),
                "pixel ({}, {})",
                x,
                y
            );
        }

        let drawn = pixmap.pixel(40, 50).unwrap();
        assert_eq!((drawn.red(), drawn.green(), drawn.blue()), (255, 0, 0));
    }

    #[test]
    fn test_missing_dimensions() {
        let graphic = VectorGraphic::new(r#"<svg xmlns="http://www.w3.org/2000/svg"></svg>"#);
        let result = exporter(100).to_raster(&graphic);
        assert!(matches!(result, Err(ConversionError::MissingDimensions)));
    }

    #[test]
    fn test_zero_view_box_uses_fallback_size() {
        let graphic = VectorGraphic::new(
            r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 0 0"><rect width="80" height="20" fill="#00ff00"/></svg>"##,
        )
        .with_fallback_size(Some(Size::new(80.0, 20.0)));

        let image = exporter(160).to_raster(&graphic).unwrap();
        assert_eq!((image.width, image.height), (160, 40));

        // Content is scaled with the canvas
        let pixel = decode(&image).pixel(150, 35).unwrap();
        assert_eq!((pixel.red(), pixel.green(), pixel.blue()), (0, 255, 0));
    }

    #[test]
    fn test_malformed_markup_is_rejected() {
        let graphic =
            VectorGraphic::new(r#"<svg viewBox="0 0 10 10"><rect></svg>"#);
        let result = exporter(100).to_raster(&graphic);
        assert!(matches!(
            result,
            Err(ConversionError::InvalidMarkup(_)) | Err(ConversionError::Decode(_))
        ));

        let result = exporter(100).to_raster(&VectorGraphic::new("plain text"));
        assert!(matches!(result, Err(ConversionError::InvalidMarkup(_))));
    }

    #[test]
    fn test_data_url_roundtrip() {
        let image = RasterImage {
            width: 1,
            height: 1,
            png: b"\x89PNG\r\n\x1a\nrest".to_vec(),
        };
        let url = image.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_url(&url, "image/png").unwrap(), image.png);
        assert!(decode_data_url(&url, "image/svg+xml").is_err());
    }

    #[tokio::test]
    async fn test_async_export() {
        let graphic = VectorGraphic::new(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 5"></svg>"#,
        );
        let image = exporter(100).export(graphic).await.unwrap();
        assert_eq!((image.width, image.height), (100, 50));
    }
}
