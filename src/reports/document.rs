use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument};

use crate::reports::chart::ChartImage;
use crate::reports::{format_average, RenderError, RenderedReport, ReportPeriod, ReportRow};

// A4 in PDF points, origin at the bottom-left corner
pub const PAGE_WIDTH: i64 = 595;
pub const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 40;

/// Table rows that fit on one page below the repeated header
pub const ROWS_PER_PAGE: usize = 27;
const ROW_HEIGHT: i64 = 25;
const TABLE_TOP: i64 = 80;
const FIRST_ROW_TOP: i64 = 115;
const COLUMN_X: [i64; 6] = [40, 130, 210, 300, 390, 480];
const COLUMN_HEADERS: [&str; 6] = ["Tanggal", "Suhu In", "pH In", "Suhu Out", "pH Out", "Jumlah"];

const HEADER_BAND: i64 = 120;
const CHART_BOX_TOP: i64 = 270;
const CHART_BOX_HEIGHT: i64 = 250;

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";
const CHART_XOBJECT: &str = "Im1";

type Rgb = (u8, u8, u8);
const PRIMARY: Rgb = (0x4a, 0xde, 0x80);
const SECONDARY: Rgb = (0x22, 0xc5, 0x5e);
const WHITE: Rgb = (0xff, 0xff, 0xff);
const PANEL: Rgb = (0xf7, 0xf7, 0xf7);
const BORDER: Rgb = (0xdd, 0xdd, 0xdd);
const TEXT: Rgb = (0x33, 0x33, 0x33);

/// Chart raster decoded to 8-bit RGB
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Writes report PDFs under the reports directory (blocking work)
#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    reports_dir: PathBuf,
    offset: FixedOffset,
    timezone_label: String,
}

impl DocumentRenderer {
    pub fn new(reports_dir: PathBuf, offset: FixedOffset, timezone_label: String) -> Self {
        Self {
            reports_dir,
            offset,
            timezone_label,
        }
    }

    pub fn output_path(&self, period: &ReportPeriod) -> PathBuf {
        self.reports_dir.join(period.file_name())
    }

    /// Build the document and overwrite whatever sits at the output path
    #[instrument(skip(self, rows, chart), fields(rows = rows.len()))]
    pub fn render_document(
        &self,
        period: &ReportPeriod,
        rows: &[ReportRow],
        chart: &ChartImage,
        printed_at: DateTime<Utc>,
    ) -> Result<RenderedReport, RenderError> {
        let image = decode_png(&chart.png)?;
        debug!("Decoded chart image {}x{}", image.width, image.height);

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(i64::from(image.width)),
                "Height" => Object::Integer(i64::from(image.height)),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => Object::Integer(8),
            },
            image.pixels.clone(),
        ));
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                FONT_REGULAR => regular_id,
                FONT_BOLD => bold_id,
            },
            "XObject" => dictionary! {
                CHART_XOBJECT => image_id,
            },
        });

        let printed_local = printed_at.with_timezone(&self.offset);
        let printed = format!(
            "Tanggal Cetak: {} {}",
            printed_local.format("%d %b %Y %H:%M"),
            self.timezone_label
        );

        let mut page_contents = vec![summary_page(period, rows, &image, &printed)];
        for chunk in paginate(rows) {
            page_contents.push(table_page(period, chunk));
        }

        let mut page_ids: Vec<Object> = Vec::with_capacity(page_contents.len());
        for operations in page_contents {
            let page_id = add_page(&mut doc, pages_id, operations)?;
            page_ids.push(page_id.into());
        }

        let page_count = page_ids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => Object::Integer(page_count),
            "Resources" => resources_id,
            "MediaBox" => vec![int(0), int(0), int(PAGE_WIDTH), int(PAGE_HEIGHT)],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        std::fs::create_dir_all(&self.reports_dir)?;
        let path = self.output_path(period);
        // Readers never observe a half-written file at the final path
        let mut staged = tempfile::NamedTempFile::new_in(&self.reports_dir)?;
        doc.save_to(staged.as_file_mut())
            .map_err(|e| RenderError::Document(e.to_string()))?;
        staged.persist(&path).map_err(|e| e.error)?;

        let byte_size = std::fs::metadata(&path)?.len();
        info!(
            "Wrote {} page report {} ({} bytes)",
            page_count,
            path.display(),
            byte_size
        );

        Ok(RenderedReport { path, byte_size })
    }
}

/// Split table rows into page-sized chunks; an empty table still gets a page
pub fn paginate(rows: &[ReportRow]) -> Vec<&[ReportRow]> {
    if rows.is_empty() {
        return vec![rows];
    }
    rows.chunks(ROWS_PER_PAGE).collect()
}

/// Decode any PNG colour type to RGB, compositing alpha onto white
pub fn decode_png(bytes: &[u8]) -> Result<RgbImage, RenderError> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder
        .read_info()
        .map_err(|e| RenderError::ChartImage(e.to_string()))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| RenderError::ChartImage(e.to_string()))?;
    let data = &buf[..info.buffer_size()];

    let pixels: Vec<u8> = match info.color_type {
        png::ColorType::Rgb => data.to_vec(),
        png::ColorType::Rgba => data
            .chunks_exact(4)
            .flat_map(|px| {
                [
                    over_white(px[0], px[3]),
                    over_white(px[1], px[3]),
                    over_white(px[2], px[3]),
                ]
            })
            .collect(),
        png::ColorType::Grayscale => data.iter().flat_map(|&g| [g, g, g]).collect(),
        png::ColorType::GrayscaleAlpha => data
            .chunks_exact(2)
            .flat_map(|px| {
                let v = over_white(px[0], px[1]);
                [v, v, v]
            })
            .collect(),
        png::ColorType::Indexed => {
            return Err(RenderError::ChartImage(
                "indexed colour was not expanded".to_string(),
            ))
        }
    };

    Ok(RgbImage {
        width: info.width,
        height: info.height,
        pixels,
    })
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    let (c, a) = (u32::from(channel), u32::from(alpha));
    ((c * a + 255 * (255 - a)) / 255) as u8
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<ObjectId, RenderError> {
    let encoded = Content { operations }
        .encode()
        .map_err(|e| RenderError::Document(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    }))
}

fn summary_page(
    period: &ReportPeriod,
    rows: &[ReportRow],
    image: &RgbImage,
    printed: &str,
) -> Vec<Operation> {
    let mut ops = Vec::new();
    let total_readings: i64 = rows.iter().map(|r| r.count).sum();

    fill_rect(&mut ops, PRIMARY, 0, 0, PAGE_WIDTH, HEADER_BAND);
    text(&mut ops, FONT_BOLD, 26, WHITE, MARGIN, 30, "LAPORAN MONITORING IPAL");
    text(&mut ops, FONT_REGULAR, 15, WHITE, MARGIN, 70, &format!("Periode: {}", period.label()));
    text(&mut ops, FONT_REGULAR, 10, WHITE, MARGIN, 95, printed);

    let info_top = HEADER_BAND + 30;
    fill_rect(&mut ops, PANEL, MARGIN, info_top, PAGE_WIDTH - 2 * MARGIN, 60);
    text(&mut ops, FONT_BOLD, 14, SECONDARY, 60, info_top + 12, "RINGKASAN DATA");
    text(
        &mut ops,
        FONT_REGULAR,
        10,
        TEXT,
        60,
        info_top + 35,
        &format!("{}: {}", period.bucket_summary_label(), rows.len()),
    );
    text(
        &mut ops,
        FONT_REGULAR,
        10,
        TEXT,
        300,
        info_top + 35,
        &format!("Total data: {}", total_readings),
    );

    text(&mut ops, FONT_BOLD, 14, SECONDARY, MARGIN, CHART_BOX_TOP - 30, "GRAFIK TREN SENSOR");
    stroke_rect(
        &mut ops,
        BORDER,
        MARGIN,
        CHART_BOX_TOP,
        PAGE_WIDTH - 2 * MARGIN,
        CHART_BOX_HEIGHT,
    );

    // Fit the chart inside the box, keeping its aspect ratio
    let (box_w, box_h) = (PAGE_WIDTH - 2 * MARGIN - 10, CHART_BOX_HEIGHT - 10);
    let (draw_w, draw_h) = fit(image.width, image.height, box_w, box_h);
    let left = MARGIN + 5 + (box_w - draw_w) / 2;
    let top = CHART_BOX_TOP + 5 + (box_h - draw_h) / 2;
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new(
        "cm",
        vec![
            int(draw_w),
            int(0),
            int(0),
            int(draw_h),
            int(left),
            int(PAGE_HEIGHT - top - draw_h),
        ],
    ));
    ops.push(Operation::new("Do", vec![Object::Name(CHART_XOBJECT.into())]));
    ops.push(Operation::new("Q", vec![]));

    ops
}

fn table_page(period: &ReportPeriod, rows: &[ReportRow]) -> Vec<Operation> {
    let mut ops = Vec::new();

    text(&mut ops, FONT_BOLD, 16, SECONDARY, MARGIN, 40, period.table_title());
    fill_rect(&mut ops, PRIMARY, MARGIN, TABLE_TOP, PAGE_WIDTH - 2 * MARGIN, 30);
    for (x, header) in COLUMN_X.iter().zip(COLUMN_HEADERS) {
        text(&mut ops, FONT_BOLD, 10, WHITE, x + 8, TABLE_TOP + 10, header);
    }

    for (i, row) in rows.iter().enumerate() {
        let top = FIRST_ROW_TOP + i as i64 * ROW_HEIGHT;
        let cells = [
            row.table_label.clone(),
            format_average(row.avg_temp_in),
            format_average(row.avg_ph_in),
            format_average(row.avg_temp_out),
            format_average(row.avg_ph_out),
            row.count.to_string(),
        ];
        for (x, cell) in COLUMN_X.iter().zip(cells.iter()) {
            text(&mut ops, FONT_REGULAR, 9, TEXT, x + 8, top, cell);
        }
    }

    ops
}

/// Largest size with the image's aspect ratio inside `max_w` x `max_h`
fn fit(width: u32, height: u32, max_w: i64, max_h: i64) -> (i64, i64) {
    if width == 0 || height == 0 {
        return (max_w, max_h);
    }
    let scale = f64::min(max_w as f64 / width as f64, max_h as f64 / height as f64);
    (
        ((width as f64 * scale).round() as i64).max(1),
        ((height as f64 * scale).round() as i64).max(1),
    )
}

fn int(value: i64) -> Object {
    Object::Integer(value)
}

fn channel(value: u8) -> Object {
    Object::Real((f32::from(value) / 255.0).into())
}

fn fill_color(ops: &mut Vec<Operation>, (r, g, b): Rgb) {
    ops.push(Operation::new("rg", vec![channel(r), channel(g), channel(b)]));
}

/// Filled rectangle with `top` measured from the top edge of the page
fn fill_rect(ops: &mut Vec<Operation>, color: Rgb, left: i64, top: i64, width: i64, height: i64) {
    fill_color(ops, color);
    ops.push(Operation::new(
        "re",
        vec![int(left), int(PAGE_HEIGHT - top - height), int(width), int(height)],
    ));
    ops.push(Operation::new("f", vec![]));
}

fn stroke_rect(ops: &mut Vec<Operation>, (r, g, b): Rgb, left: i64, top: i64, width: i64, height: i64) {
    ops.push(Operation::new("RG", vec![channel(r), channel(g), channel(b)]));
    ops.push(Operation::new(
        "re",
        vec![int(left), int(PAGE_HEIGHT - top - height), int(width), int(height)],
    ));
    ops.push(Operation::new("S", vec![]));
}

/// One line of text whose top edge sits `top` points below the page top
fn text(
    ops: &mut Vec<Operation>,
    font: &str,
    size: i64,
    color: Rgb,
    left: i64,
    top: i64,
    value: &str,
) {
    fill_color(ops, color);
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![Object::Name(font.into()), int(size)]));
    ops.push(Operation::new("Td", vec![int(left), int(PAGE_HEIGHT - top - size)]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(value)]));
    ops.push(Operation::new("ET", vec![]));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(width: u32, height: u32, color: png::ColorType, data: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, width, height);
            encoder.set_color(color);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        bytes
    }

    fn row(day: u32) -> ReportRow {
        ReportRow {
            chart_label: format!("{:02}/01", day),
            table_label: format!("{:02}/01/2024", day),
            avg_temp_in: Some(30.0),
            avg_ph_in: Some(7.0),
            avg_temp_out: Some(29.0),
            avg_ph_out: None,
            count: 2,
        }
    }

    #[test]
    fn test_decode_rgba_composites_on_white() {
        // One opaque red pixel, one fully transparent pixel
        let png = encode_png(2, 1, png::ColorType::Rgba, &[255, 0, 0, 255, 0, 0, 0, 0]);
        let image = decode_png(&png).unwrap();
        assert_eq!((image.width, image.height), (2, 1));
        assert_eq!(image.pixels, vec![255, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_decode_grayscale_expands() {
        let png = encode_png(1, 1, png::ColorType::Grayscale, &[40]);
        assert_eq!(decode_png(&png).unwrap().pixels, vec![40, 40, 40]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_png(b"not an image"),
            Err(RenderError::ChartImage(_))
        ));
    }

    #[test]
    fn test_paginate_respects_row_budget() {
        let rows: Vec<ReportRow> = (1..=31).map(row).collect();
        let pages = paginate(&rows);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].len(), ROWS_PER_PAGE);
        assert_eq!(pages[1].len(), 31 - ROWS_PER_PAGE);
        assert_eq!(paginate(&[]).len(), 1);
    }

    #[test]
    fn test_fit_keeps_aspect_ratio() {
        assert_eq!(fit(1000, 400, 505, 240), (505, 202));
        assert_eq!(fit(100, 100, 505, 240), (240, 240));
    }

    #[test]
    fn test_over_white() {
        assert_eq!(over_white(0, 0), 255);
        assert_eq!(over_white(0, 255), 0);
        assert_eq!(over_white(100, 255), 100);
    }
}
