use image::{DynamicImage, ImageFormat as Codec, Rgb, RgbImage};
use std::fmt::{Display, Formatter};
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

use crate::allocate::validate_name;
use crate::{wbmp, Error, Result, TempFile, TempFileRegistry};

/// Largest canvas (in pixels) the image producer agrees to allocate,
/// i.e. 16384 x 16384.
const MAX_CANVAS_PIXELS: u64 = 1 << 28;

/// Raster formats the image producer can write.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
    Gif,
    Bmp,
    WebP,
    Wbmp,
}

impl ImageFormat {
    /// The extension given to generated image files.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::WebP => "webp",
            Self::Wbmp => "wbmp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::WebP => "image/webp",
            Self::Wbmp => "image/vnd.wap.wbmp",
        }
    }

    /// The `image` codec for this format, if it has one.
    fn codec(self) -> Option<Codec> {
        match self {
            Self::Jpeg => Some(Codec::Jpeg),
            Self::Png => Some(Codec::Png),
            Self::Gif => Some(Codec::Gif),
            Self::Bmp => Some(Codec::Bmp),
            Self::WebP => Some(Codec::WebP),
            Self::Wbmp => None,
        }
    }
}

/// Parses a format name case-insensitively; `jpg` is accepted for JPEG.
impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "gif" => Ok(Self::Gif),
            "bmp" => Ok(Self::Bmp),
            "webp" => Ok(Self::WebP),
            "wbmp" => Ok(Self::Wbmp),
            _ => Err(Error::UnsupportedFormat(s.to_owned())),
        }
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Parameters of a generated image file.
///
/// Defaults to a 10 x 10 JPEG with a generated name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOptions {
    width: u32,
    height: u32,
    format: Option<String>,
    name: Option<String>,
}

impl ImageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dimensions in pixels.
    ///
    /// Both must be non-zero and the canvas may hold at most 2^28 pixels
    /// (e.g. 16384 x 16384); anything else fails with [`Error::Encoding`]
    /// when the image is produced.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the format by name (`"png"`, `"JPG"`, ...) or by [`ImageFormat`].
    /// Unknown names are reported when the image is produced.
    pub fn format(mut self, format: impl ToString) -> Self {
        self.format = Some(format.to_string());
        self
    }

    /// Creates the image under this name in the temp directory.
    ///
    /// The name must carry an extension. Without an explicit format the
    /// extension selects it; with one, both must agree.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Works out the format and name to use without touching the file system.
    fn resolve(&self) -> Result<(ImageFormat, Option<&str>)> {
        let requested = self
            .format
            .as_deref()
            .map(ImageFormat::from_str)
            .transpose()?;

        let Some(name) = self.name.as_deref() else {
            return Ok((requested.unwrap_or_default(), None));
        };

        validate_name(name)?;
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| Error::invalid_name(name, "image name has no extension"))?;
        let named = ImageFormat::from_str(extension);

        match (requested, named) {
            (None, named) => Ok((named?, Some(name))),
            (Some(format), Ok(named)) if format == named => Ok((format, Some(name))),
            (Some(_), _) => Err(Error::invalid_name(
                name,
                "image name extension does not match the image format",
            )),
        }
    }
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            format: None,
            name: None,
        }
    }
}

impl TempFileRegistry {
    /// Creates a temporary file holding a solid black image.
    ///
    /// Format, name and dimensions are validated and the image is encoded
    /// before any file is created.
    pub async fn new_image(&self, options: &ImageOptions) -> Result<TempFile> {
        let (format, name) = options.resolve()?;
        let encoded = encode(&canvas(options.width, options.height)?, format)?;

        let file = match name {
            Some(name) => self.new_file_with_name(name).await?,
            None => self.new_file_with_extension(format.extension()).await?,
        };
        file.fill_from_bytes(&encoded).await?;

        tracing::debug!(
            path = %file.file_path().display(),
            %format,
            width = options.width,
            height = options.height,
            "Created temporary image"
        );
        Ok(file)
    }
}

impl TempFile {
    /// Creates a temporary image file in the global registry.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tracked_tempfile::{ImageOptions, TempFile, Error};
    /// # let _ = tokio_test::block_on(async {
    /// let file = TempFile::image(&ImageOptions::new().size(5, 6).format("PNG")).await?;
    /// assert_eq!(file.file_path().extension().unwrap(), "png");
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub async fn image(options: &ImageOptions) -> Result<Self> {
        TempFileRegistry::global().new_image(options).await
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    let pixels = u64::from(width) * u64::from(height);
    if pixels == 0 || pixels > MAX_CANVAS_PIXELS {
        return Err(Error::encoding(format!(
            "cannot create a {width}x{height} canvas"
        )));
    }
    Ok(())
}

fn canvas(width: u32, height: u32) -> Result<DynamicImage> {
    check_dimensions(width, height)?;
    Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
        width,
        height,
        Rgb([0, 0, 0]),
    )))
}

fn encode(canvas: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    match format.codec() {
        Some(codec) => canvas
            .write_to(&mut buffer, codec)
            .map_err(|e| Error::Encoding {
                reason: format!("unable to encode {format} image"),
                source: Some(Box::new(e)),
            })?,
        None => wbmp::encode(&canvas.to_luma8(), &mut buffer).map_err(|e| Error::Encoding {
            reason: format!("unable to encode {format} image"),
            source: Some(Box::new(e)),
        })?,
    }
    Ok(buffer.into_inner())
}
