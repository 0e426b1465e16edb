//! # PDF Renderer
//!
//! Writes a one-page PDF with a text header and the prescription photo.
//!
//! The JPEG is embedded as-is (`/DCTDecode`), so no image decoding happens.
//! Header text uses the `HeiseiKakuGo-W5` CID font with the `UniJIS-UCS2-H`
//! encoding; PDF viewers and printers ship it as a standard Japanese font.

use crate::domain::errors::CollaboratorError;
use crate::domain::layout::PageLayout;
use crate::ports::outbound::{DocumentHeader, DocumentRenderer};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::Path;

/// Pixel size and colour layout of a baseline or progressive JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegInfo {
    pub width: u32,
    pub height: u32,
    pub components: u8,
}

impl JpegInfo {
    fn color_space(&self) -> &'static str {
        match self.components {
            1 => "/DeviceGray",
            4 => "/DeviceCMYK",
            _ => "/DeviceRGB",
        }
    }
}

/// Read the frame header (SOFn) of a JPEG stream.
pub fn jpeg_info(bytes: &[u8]) -> Result<JpegInfo, String> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return Err("not a JPEG (missing SOI marker)".into());
    }

    let mut pos = 2;
    while pos + 1 < bytes.len() {
        if bytes[pos] != 0xFF {
            return Err(format!("corrupt JPEG: expected marker at byte {pos}"));
        }
        // Skip fill bytes.
        while pos + 1 < bytes.len() && bytes[pos + 1] == 0xFF {
            pos += 1;
        }
        let Some(&marker) = bytes.get(pos + 1) else {
            return Err("truncated JPEG: marker without code".into());
        };
        pos += 2;

        // Standalone markers carry no length.
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }
        if marker == 0xD9 || marker == 0xDA {
            break;
        }
        if pos + 2 > bytes.len() {
            break;
        }
        let length = u16::from_be_bytes([bytes[pos], bytes[pos + 1]]) as usize;
        if length < 2 || pos + length > bytes.len() {
            return Err("corrupt JPEG: segment overruns data".into());
        }

        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            if length < 8 {
                return Err("corrupt JPEG: short frame header".into());
            }
            let height = u16::from_be_bytes([bytes[pos + 3], bytes[pos + 4]]) as u32;
            let width = u16::from_be_bytes([bytes[pos + 5], bytes[pos + 6]]) as u32;
            let components = bytes[pos + 7];
            if width == 0 || height == 0 {
                return Err("JPEG has zero dimension".into());
            }
            return Ok(JpegInfo {
                width,
                height,
                components,
            });
        }
        pos += length;
    }

    Err("JPEG frame header not found".into())
}

/// Header text as a UTF-16BE hex string for `UniJIS-UCS2-H`.
fn ucs2_hex(text: &str) -> String {
    let mut hex = String::with_capacity(text.len() * 4 + 2);
    hex.push('<');
    for c in text.chars() {
        // UCS-2 covers the BMP only.
        let unit = u16::try_from(u32::from(c)).unwrap_or(0x003F);
        let _ = write!(hex, "{unit:04X}");
    }
    hex.push('>');
    hex
}

/// Serialize the page into PDF bytes.
pub fn render_pdf(
    jpeg: &[u8],
    header: &DocumentHeader,
    layout: &PageLayout,
) -> Result<Vec<u8>, String> {
    let info = jpeg_info(jpeg)?;
    let placement = layout.place_image(info.width, info.height);

    let mut content = String::new();
    for (n, line) in header.lines.iter().enumerate() {
        let _ = writeln!(
            content,
            "BT /F1 {:.1} Tf {:.2} {:.2} Td {} Tj ET",
            layout.font_size,
            layout.margin,
            layout.header_baseline(n),
            ucs2_hex(line)
        );
    }
    let _ = writeln!(
        content,
        "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /Im1 Do Q",
        placement.width, placement.height, placement.x, placement.y
    );

    let mut pdf = PdfBuilder::new();
    pdf.object(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    pdf.object(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec());
    pdf.object(
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
             /Resources << /Font << /F1 6 0 R >> /XObject << /Im1 5 0 R >> >> \
             /Contents 4 0 R >>",
            layout.width, layout.height
        )
        .into_bytes(),
    );
    pdf.stream(String::new(), content.as_bytes());
    pdf.stream(
        format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} \
             /BitsPerComponent 8 /Filter /DCTDecode",
            info.width,
            info.height,
            info.color_space()
        ),
        jpeg,
    );
    pdf.object(
        b"<< /Type /Font /Subtype /Type0 /BaseFont /HeiseiKakuGo-W5-UniJIS-UCS2-H \
          /Encoding /UniJIS-UCS2-H /DescendantFonts [7 0 R] >>"
            .to_vec(),
    );
    pdf.object(
        b"<< /Type /Font /Subtype /CIDFontType0 /BaseFont /HeiseiKakuGo-W5 \
          /CIDSystemInfo << /Registry (Adobe) /Ordering (Japan1) /Supplement 2 >> \
          /FontDescriptor 8 0 R /DW 1000 /W [231 389 500 631 631 500] >>"
            .to_vec(),
    );
    pdf.object(
        b"<< /Type /FontDescriptor /FontName /HeiseiKakuGo-W5 /Flags 4 \
          /FontBBox [-92 -250 1010 922] /ItalicAngle 0 /Ascent 752 /Descent -221 \
          /CapHeight 737 /StemV 114 >>"
            .to_vec(),
    );
    Ok(pdf.finish())
}

/// Minimal PDF object writer with a cross-reference table.
struct PdfBuilder {
    out: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfBuilder {
    fn new() -> Self {
        // Binary comment marks the file as 8-bit for transfer tools.
        let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        out.reserve(4096);
        Self {
            out,
            offsets: Vec::new(),
        }
    }

    fn begin(&mut self) {
        self.offsets.push(self.out.len());
        let id = self.offsets.len();
        self.out.extend_from_slice(format!("{id} 0 obj\n").as_bytes());
    }

    fn object(&mut self, body: Vec<u8>) {
        self.begin();
        self.out.extend_from_slice(&body);
        self.out.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, dict_entries: String, data: &[u8]) {
        self.begin();
        self.out.extend_from_slice(
            format!("<< {dict_entries} /Length {} >>\nstream\n", data.len()).as_bytes(),
        );
        self.out.extend_from_slice(data);
        self.out.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self) -> Vec<u8> {
        let xref = self.out.len();
        let count = self.offsets.len() + 1;
        let mut table = format!("xref\n0 {count}\n0000000000 65535 f \n");
        for offset in &self.offsets {
            let _ = write!(table, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            table,
            "trailer\n<< /Size {count} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n"
        );
        self.out.extend_from_slice(table.as_bytes());
        self.out
    }
}

/// [`DocumentRenderer`] writing PDF files.
#[derive(Debug, Clone, Default)]
pub struct PdfDocumentRenderer {
    layout: PageLayout,
}

impl PdfDocumentRenderer {
    pub fn new(layout: PageLayout) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl DocumentRenderer for PdfDocumentRenderer {
    async fn render(
        &self,
        image: &Path,
        header: &DocumentHeader,
        output: &Path,
    ) -> Result<(), CollaboratorError> {
        let render_err = |reason: String| CollaboratorError::Render {
            path: output.to_path_buf(),
            reason,
        };

        let jpeg = tokio::fs::read(image)
            .await
            .map_err(|e| render_err(format!("cannot read {}: {e}", image.display())))?;
        let bytes = render_pdf(&jpeg, header, &self.layout).map_err(render_err)?;

        let mut partial = output.as_os_str().to_owned();
        partial.push(".part");
        tokio::fs::write(&partial, &bytes)
            .await
            .map_err(|e| render_err(e.to_string()))?;
        tokio::fs::rename(&partial, output)
            .await
            .map_err(|e| render_err(e.to_string()))?;
        Ok(())
    }
}
