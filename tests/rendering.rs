use asset_report::emit::{Backend, DrawEmitter, TableEmitter};
use asset_report::fonts;
use asset_report::layout::PageGeometry;
use asset_report::model::{Record, ReportScope};
use asset_report::{generate, ReportError};
use sha2::{Digest, Sha256};

fn sample_records() -> Vec<Record> {
    vec![
        Record::new()
            .with_plate("PAT-001")
            .with_name("Notebook")
            .with_description("Notebook de desenvolvimento")
            .with_conservation_state("Bom")
            .with_current_value("10.5")
            .with_market_value("12")
            .with_cost_center("A"),
        Record::new()
            .with_plate("PAT-002")
            .with_name("Cadeira")
            .with_current_value("20")
            .with_cost_center("B"),
        Record::new()
            .with_plate("PAT-003")
            .with_name("Monitor")
            .with_current_value("5")
            .with_market_value("not a number")
            .with_cost_center("A"),
    ]
}

fn render_sample_pdf(scope: &ReportScope) -> Vec<u8> {
    generate(sample_records(), scope, &DrawEmitter::default())
        .expect("render sample pdf")
        .bytes
}

fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    fn scrub_segment(data: &mut [u8], tag: &[u8], terminator: u8) {
        let mut index = 0;
        while index + tag.len() < data.len() {
            if data[index..].starts_with(tag) {
                let mut cursor = index + tag.len();
                while cursor < data.len() {
                    let byte = data[cursor];
                    if byte == terminator {
                        break;
                    }
                    if terminator == b')' {
                        data[cursor] = b'0';
                    } else if !matches!(byte, b'<' | b'>' | b' ' | b'\n' | b'\r' | b'\t') {
                        data[cursor] = b'0';
                    }
                    cursor += 1;
                }
                index = cursor;
            } else {
                index += 1;
            }
        }
    }

    fn scrub_xml(data: &mut [u8], start: &[u8], end: &[u8]) {
        let mut offset = 0;
        while offset + start.len() < data.len() {
            if let Some(start_pos) = data[offset..]
                .windows(start.len())
                .position(|window| window == start)
            {
                let start_index = offset + start_pos + start.len();
                if let Some(end_pos) = data[start_index..]
                    .windows(end.len())
                    .position(|window| window == end)
                {
                    for byte in &mut data[start_index..start_index + end_pos] {
                        if !matches!(*byte, b'<' | b'>' | b'/' | b' ' | b'\n' | b'\r' | b'\t') {
                            *byte = b'0';
                        }
                    }
                    offset = start_index + end_pos + end.len();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
    }

    let mut normalized = bytes.to_vec();
    scrub_segment(&mut normalized, b"/CreationDate(", b')');
    scrub_segment(&mut normalized, b"/ModDate(", b')');
    scrub_segment(&mut normalized, b"/ID[", b']');
    scrub_segment(&mut normalized, b"/Producer(", b')');
    scrub_xml(&mut normalized, b"<xmp:CreateDate>", b"</xmp:CreateDate>");
    scrub_xml(&mut normalized, b"<xmp:ModifyDate>", b"</xmp:ModifyDate>");
    scrub_xml(
        &mut normalized,
        b"<xmp:MetadataDate>",
        b"</xmp:MetadataDate>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:DocumentID>",
        b"</xmpMM:DocumentID>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:InstanceID>",
        b"</xmpMM:InstanceID>",
    );
    scrub_xml(&mut normalized, b"<xmpMM:VersionID>", b"</xmpMM:VersionID>");
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    let normalized = scrub_pdf(bytes);
    let digest = Sha256::digest(&normalized);
    digest.into()
}

#[test]
fn renders_non_empty_output() {
    let bytes = render_sample_pdf(&ReportScope::All);
    assert!(bytes.starts_with(b"%PDF"), "rendered PDF should start with a header");
}

#[test]
fn rendering_is_deterministic() {
    let scope = ReportScope::CostCenter("A".into());
    let bytes_a = render_sample_pdf(&scope);
    let bytes_b = render_sample_pdf(&scope);

    assert_eq!(bytes_a.len(), bytes_b.len(), "PDF sizes should match");
    assert_eq!(
        normalized_hash(&bytes_a),
        normalized_hash(&bytes_b),
        "PDF renders must be deterministic after metadata normalization"
    );
}

#[test]
fn unknown_cost_center_produces_no_document() {
    let records: Vec<Record> = sample_records()
        .into_iter()
        .filter(|record| record.cost_center() == Some("Z"))
        .collect();
    let result = generate(records, &ReportScope::CostCenter("Z".into()), &DrawEmitter::default());
    assert!(matches!(result, Err(ReportError::NoRecords(_))));
}

#[test]
fn table_backend_renders_when_fonts_exist() {
    if !fonts::fonts_available(None) {
        eprintln!(
            "Skipping table_backend_renders_when_fonts_exist: no fonts found. Set ASSET_REPORT_FONTS_DIR to a Roboto directory or install Liberation Sans."
        );
        return;
    }

    let emitter = TableEmitter::new(None, PageGeometry::a4());
    let rendered = generate(sample_records(), &ReportScope::All, &emitter).expect("render");
    assert!(rendered.bytes.starts_with(b"%PDF"));
    assert_eq!(rendered.page_count, None);
}

#[test]
fn draw_backend_reports_page_count_and_skipped_images() {
    let emitter = Backend::Draw.emitter(None);
    let mut records = sample_records();
    records.push(
        Record::new()
            .with_plate("PAT-004")
            .with_cost_center("B")
            .with_image("data:image/png;base64,@@@@"),
    );

    let rendered = generate(records, &ReportScope::All, emitter.as_ref()).expect("render");
    assert!(rendered.bytes.starts_with(b"%PDF"));
    assert!(matches!(rendered.page_count, Some(pages) if pages >= 1));
    assert_eq!(rendered.skipped_images, 1);
}
