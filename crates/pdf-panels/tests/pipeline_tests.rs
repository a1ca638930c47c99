use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pdf_panels::*;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FOOTER_WIDTH: i64 = 600;
const FOOTER_HEIGHT: i64 = 150;

/// Directories for one test run: footers, output and scratch space
struct Fixture {
    _root: TempDir,
    footer_dir: PathBuf,
    output_dir: PathBuf,
    scratch_dir: PathBuf,
    source: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let footer_dir = root.path().join("footers");
        let output_dir = root.path().join("out");
        let scratch_dir = root.path().join("scratch");
        for dir in [&footer_dir, &output_dir, &scratch_dir] {
            std::fs::create_dir_all(dir).unwrap();
        }

        let source = root.path().join("Ivy.png");
        RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, 120]))
            .save(&source)
            .unwrap();

        Self {
            _root: root,
            footer_dir,
            output_dir,
            scratch_dir,
            source,
        }
    }

    fn config(&self) -> PanelConfig {
        PanelConfig {
            footer_dir: self.footer_dir.clone(),
            output_dir: self.output_dir.clone(),
            scratch_dir: Some(self.scratch_dir.clone()),
            substrates: vec![Substrate::Traditional],
            heights_ft: vec![13],
            bleeds: vec![Bleed::Mm2],
            ..Default::default()
        }
    }

    fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(&self.scratch_dir).unwrap().next().is_none()
    }

    fn output_count(&self) -> usize {
        std::fs::read_dir(&self.output_dir).unwrap().count()
    }
}

/// Single-page footer: a filled band, optionally with an embedded raster
fn write_footer_pdf(path: &Path, with_image: bool) {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut content = format!("0.2 g 0 0 {} {} re f\n", FOOTER_WIDTH, FOOTER_HEIGHT);
    let mut xobjects = Dictionary::new();
    if with_image {
        let pixels: Vec<u8> = (0..20 * 5).flat_map(|i| [i as u8, 40, 200]).collect();
        let image_id = doc.add_object(Stream::new(
            Dictionary::from_iter(vec![
                ("Type", Object::Name(b"XObject".to_vec())),
                ("Subtype", Object::Name(b"Image".to_vec())),
                ("Width", Object::Integer(20)),
                ("Height", Object::Integer(5)),
                ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
                ("BitsPerComponent", Object::Integer(8)),
            ]),
            pixels,
        ));
        xobjects.set("Im0", Object::Reference(image_id));
        content.push_str(&format!(
            "q {} 0 0 {} 0 0 cm /Im0 Do Q\n",
            FOOTER_WIDTH, FOOTER_HEIGHT
        ));
    }

    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
    let page_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(FOOTER_WIDTH),
                Object::Integer(FOOTER_HEIGHT),
            ]),
        ),
        (
            "Resources",
            Object::Dictionary(Dictionary::from_iter(vec![(
                "XObject",
                Object::Dictionary(xobjects),
            )])),
        ),
        ("Contents", Object::Reference(content_id)),
    ]));

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(vec![Object::Reference(page_id)])),
        ("Count", Object::Integer(1)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    doc.save(path).unwrap();
}

fn only_page(doc: &Document) -> ObjectId {
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1);
    *pages.values().next().unwrap()
}

fn media_box(doc: &Document, page_id: ObjectId) -> Vec<f32> {
    doc.get_dictionary(page_id)
        .unwrap()
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_float().unwrap())
        .collect()
}

fn xobject_names(doc: &Document, page_id: ObjectId) -> Vec<String> {
    let resources = doc
        .get_dictionary(page_id)
        .unwrap()
        .get(b"Resources")
        .unwrap()
        .as_dict()
        .unwrap();
    resources
        .get(b"XObject")
        .unwrap()
        .as_dict()
        .unwrap()
        .iter()
        .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
        .collect()
}

fn stamped_text(doc: &Document, page_id: ObjectId) -> Vec<Vec<u8>> {
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .map(|op| op.operands[0].as_str().unwrap().to_vec())
        .collect()
}

/// Operands of the `cm` that places XObject `name`
fn placement_of(doc: &Document, page_id: ObjectId, name: &str) -> Vec<f32> {
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    let ops = &content.operations;
    let draw = ops
        .iter()
        .position(|op| {
            op.operator == "Do" && op.operands[0].as_name().unwrap() == name.as_bytes()
        })
        .unwrap();
    assert_eq!(ops[draw - 1].operator, "cm");
    ops[draw - 1]
        .operands
        .iter()
        .map(|v| v.as_float().unwrap())
        .collect()
}

fn xobject_stream<'a>(doc: &'a Document, page_id: ObjectId, name: &str) -> &'a Stream {
    let resources = doc
        .get_dictionary(page_id)
        .unwrap()
        .get(b"Resources")
        .unwrap()
        .as_dict()
        .unwrap();
    let id = resources
        .get(b"XObject")
        .unwrap()
        .as_dict()
        .unwrap()
        .get(name.as_bytes())
        .unwrap()
        .as_reference()
        .unwrap();
    doc.get_object(id).unwrap().as_stream().unwrap()
}

fn stream_bytes(stream: &Stream) -> Vec<u8> {
    if stream.dict.has(b"Filter") {
        stream.decompressed_content().unwrap()
    } else {
        stream.content.clone()
    }
}

fn assert_close(actual: &[f32], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((*a as f64 - e).abs() < 1e-2, "{:?} vs {:?}", actual, expected);
    }
}

/// Flat 40x10 pt page rendered at `scale`; fully clear when `transparent`
fn flat_raster(scale: f32, transparent: bool) -> DynamicImage {
    let alpha = if transparent { 0 } else { 255 };
    let (width, height) = ((40.0 * scale) as u32, (10.0 * scale) as u32);
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([30, 60, 90, alpha])))
}

fn info_entry(doc: &Document, key: &[u8]) -> Vec<u8> {
    let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    doc.get_dictionary(info_id)
        .unwrap()
        .get(key)
        .unwrap()
        .as_str()
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_standard_panel_end_to_end() {
    let fixture = Fixture::new();
    write_footer_pdf(&fixture.footer_dir.join("LPfooter.pdf"), false);
    let config = fixture.config();
    let spec = config.panel_spec("Ivy", Substrate::Traditional, 13, Bleed::Mm2);

    let result = generate_panel(&fixture.source, &spec, &config).await.unwrap();
    assert_eq!(result.path, fixture.output_dir.join("Ivy_TRAD_13ft_2mm.pdf"));
    assert_eq!(result.strategy, FooterStrategy::VectorOverlay);

    let expected_width = 1728.0 + 2.0 * 5.6693;
    let expected_footer = FOOTER_HEIGHT as f64 * expected_width / FOOTER_WIDTH as f64;
    assert!((result.footer_height - expected_footer).abs() < 1e-6);
    assert!(result.layout.stack_height >= result.layout.page_height);

    let doc = load_pdf(&result.path).await.unwrap();
    let page_id = only_page(&doc);
    let mbox = media_box(&doc, page_id);
    assert!((mbox[2] as f64 - expected_width).abs() < 1e-2);
    assert!((mbox[3] - 11232.0).abs() < 1e-2);

    let names = xobject_names(&doc, page_id);
    assert!(names.contains(&"Tile".to_string()));
    assert!(names.contains(&"Footer".to_string()));

    let text = stamped_text(&doc, page_id);
    assert_eq!(
        text,
        vec![b"Ivy".to_vec(), b"Traditional".to_vec(), b"13ft\"".to_vec()]
    );

    assert_eq!(info_entry(&doc, b"Title"), b"TRAD 13ft 2mm".to_vec());
    assert_eq!(info_entry(&doc, b"Author"), b"Automated PDF Generator".to_vec());
    assert_eq!(info_entry(&doc, b"Subject"), b"High-Quality Print for Ivy".to_vec());
    assert_eq!(
        info_entry(&doc, b"Keywords"),
        b"large format, high quality, print, 2mm bleed".to_vec()
    );

    assert!(fixture.scratch_is_empty());
}

#[tokio::test]
async fn test_rerun_overwrites_same_file() {
    let fixture = Fixture::new();
    write_footer_pdf(&fixture.footer_dir.join("LPfooter.pdf"), false);
    let config = fixture.config();
    let target = fixture.output_dir.join("Ivy_TRAD_13ft_2mm.pdf");
    std::fs::write(&target, b"stale bytes").unwrap();

    let first = generate_batch(&fixture.source, "Ivy", &config).await.unwrap();
    let second = generate_batch(&fixture.source, "Ivy", &config).await.unwrap();
    assert!(first.is_success());
    assert!(second.is_success());

    assert_eq!(fixture.output_count(), 1);
    let doc = load_pdf(&target).await.unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[tokio::test]
async fn test_missing_font_falls_back() {
    let fixture = Fixture::new();
    write_footer_pdf(&fixture.footer_dir.join("LPfooter.pdf"), false);
    let mut config = fixture.config();
    config.font_path = Some(fixture.footer_dir.join("Missing-Font.ttf"));

    let report = generate_batch(&fixture.source, "Ivy", &config).await.unwrap();
    assert!(report.is_success());

    let path = &report.succeeded().next().unwrap().path;
    let doc = load_pdf(path).await.unwrap();
    let page_id = only_page(&doc);
    let font_ref = doc
        .get_dictionary(page_id)
        .unwrap()
        .get(b"Resources")
        .and_then(Object::as_dict)
        .and_then(|r| r.get(b"Font"))
        .and_then(Object::as_dict)
        .and_then(|f| f.get(b"FStamp"))
        .and_then(Object::as_reference)
        .unwrap();
    let font = doc.get_dictionary(font_ref).unwrap();
    assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
}

#[tokio::test]
async fn test_missing_height_footer_only_fails_that_height() {
    let fixture = Fixture::new();
    write_footer_pdf(&fixture.footer_dir.join("LemonPark13_Footer.pdf"), false);
    let mut config = fixture.config();
    config.footer = FooterSelection::PerHeight {
        template: "LemonPark{height}_Footer.pdf".to_string(),
    };
    config.heights_ft = vec![13, 27];

    let report = generate_batch(&fixture.source, "Ivy", &config).await.unwrap();
    assert_eq!(report.outcomes.len(), 2);
    assert!(!report.is_success());
    assert_eq!(report.succeeded().count(), 1);

    let (spec, err) = report.failed().next().unwrap();
    assert_eq!(spec.height_ft, 27);
    assert_eq!(err.kind(), ErrorKind::AssetMissing);

    assert!(fixture.output_dir.join("Ivy_TRAD_13ft_2mm.pdf").exists());
    assert!(!fixture.output_dir.join("Ivy_TRAD_27ft_2mm.pdf").exists());
    assert_eq!(fixture.output_count(), 1);
    assert!(fixture.scratch_is_empty());
}

#[tokio::test]
async fn test_tall_panel_merges_into_fresh_document() {
    let fixture = Fixture::new();
    write_footer_pdf(&fixture.footer_dir.join("LPfooter.pdf"), true);
    let mut config = fixture.config();
    config.heights_ft = vec![27];
    config.bleeds = vec![Bleed::Mm3];

    let report = generate_batch(&fixture.source, "Ivy", &config).await.unwrap();
    assert!(report.is_success());
    let result = report.succeeded().next().unwrap();
    assert_eq!(result.strategy, FooterStrategy::VectorMerge);
    assert_eq!(result.path, fixture.output_dir.join("Ivy_TRAD_27ft_3mm.pdf"));

    let doc = load_pdf(&result.path).await.unwrap();
    let page_id = only_page(&doc);
    let mut names = xobject_names(&doc, page_id);
    names.sort();
    assert_eq!(names, vec!["Footer".to_string(), "Panel".to_string()]);

    let mbox = media_box(&doc, page_id);
    assert!((mbox[3] - 27.0 * 864.0).abs() < 1e-2);
    assert_eq!(stamped_text(&doc, page_id)[2], b"27ft\"".to_vec());
}

#[test]
fn test_raster_footer_and_centered_logo() {
    let fixture = Fixture::new();
    let footer = fixture.footer_dir.join("LPfooter.pdf");
    let logo = fixture.footer_dir.join("logo.pdf");
    write_footer_pdf(&footer, false);
    write_footer_pdf(&logo, false);

    let mut config = fixture.config();
    config.logo_file = Some(PathBuf::from("logo.pdf"));
    config.tiers.standard.strategy = FooterStrategy::Raster { resolution: 2.0 };
    config.tiers.standard.font_size = Some(18.0);
    let spec = config.panel_spec("Ivy", Substrate::Traditional, 13, Bleed::Mm2);

    let workspace = Workspace::create(Some(fixture.scratch_dir.as_path())).unwrap();
    let enhanced = enhance(&fixture.source, &config.enhancement, &workspace).unwrap();
    let tiled = tile(&enhanced, &spec, &config, &workspace).unwrap();
    workspace.discard(&enhanced.path);
    let asset = resolve_footer_asset(&spec, &config).unwrap();

    let calls = RefCell::new(Vec::new());
    let result = apply_footer_with(
        &tiled,
        &spec,
        &asset,
        &config,
        &workspace,
        |pdf: &Path, scale: f32, transparent: bool| {
            calls.borrow_mut().push((pdf.to_path_buf(), scale, transparent));
            Ok(flat_raster(scale, transparent))
        },
    )
    .unwrap();

    // Footer renders opaque at the tier resolution, the logo keeps alpha
    assert_eq!(
        calls.into_inner(),
        vec![(footer, 2.0, false), (logo, 3.0, true)]
    );
    assert_eq!(result.strategy, FooterStrategy::Raster { resolution: 2.0 });

    let page_width = result.layout.page_width;
    let footer_height = result.footer_height;
    let expected = FOOTER_HEIGHT as f64 * page_width / FOOTER_WIDTH as f64;
    assert!((footer_height - expected).abs() < 1e-6);

    let doc = Document::load(&result.path).unwrap();
    let page_id = only_page(&doc);
    let mut names = xobject_names(&doc, page_id);
    names.sort();
    assert_eq!(names, vec!["Footer".to_string(), "Logo".to_string(), "Tile".to_string()]);

    assert_close(
        &placement_of(&doc, page_id, "Footer"),
        &[page_width, 0.0, 0.0, footer_height, 0.0, 0.0],
    );
    let logo_width = 1.5 * footer_height;
    let logo_height = 0.7 * footer_height;
    assert_close(
        &placement_of(&doc, page_id, "Logo"),
        &[
            logo_width,
            0.0,
            0.0,
            logo_height,
            (page_width - logo_width) / 2.0,
            (footer_height - logo_height) / 2.0,
        ],
    );

    let footer_image = xobject_stream(&doc, page_id, "Footer");
    assert_eq!(footer_image.dict.get(b"Width").unwrap().as_i64().unwrap(), 80);
    assert!(!footer_image.dict.has(b"SMask"));

    let logo_image = xobject_stream(&doc, page_id, "Logo");
    assert_eq!(logo_image.dict.get(b"Width").unwrap().as_i64().unwrap(), 120);
    let mask_id = logo_image.dict.get(b"SMask").unwrap().as_reference().unwrap();
    let mask = doc.get_object(mask_id).unwrap().as_stream().unwrap();
    let alpha = stream_bytes(mask);
    assert_eq!(alpha.len(), 120 * 30);
    assert!(alpha.iter().all(|&a| a == 0));

    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    let size = content
        .operations
        .iter()
        .find(|op| op.operator == "Tf")
        .map(|op| op.operands[1].as_float().unwrap())
        .unwrap();
    assert_eq!(size, 18.0);

    // Tiled page and both rasters are discarded
    assert_eq!(std::fs::read_dir(workspace.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_undecodable_source_aborts_batch() {
    let fixture = Fixture::new();
    write_footer_pdf(&fixture.footer_dir.join("LPfooter.pdf"), false);
    let broken = fixture.scratch_dir.join("broken.jpg");
    std::fs::write(&broken, b"this is not an image").unwrap();

    let err = generate_batch(&broken, "Ivy", &fixture.config())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(fixture.output_count(), 0);
}

#[tokio::test]
async fn test_empty_design_name_rejected() {
    let fixture = Fixture::new();
    let err = generate_batch(&fixture.source, "  ", &fixture.config())
        .await
        .unwrap_err();
    assert!(matches!(err, PanelError::Config(_)));
}

#[test]
fn test_optimizer_upscales_embedded_image() {
    let fixture = Fixture::new();
    let footer = fixture.footer_dir.join("LPfooter.pdf");
    write_footer_pdf(&footer, true);
    let output = fixture.output_dir.join("LPfooter_optimized.pdf");
    let workspace = Workspace::create(Some(fixture.scratch_dir.as_path())).unwrap();

    let result =
        optimize_footer(&footer, &output, &FooterOptimization::default(), &workspace).unwrap();
    assert_eq!(result, output);

    let doc = Document::load(&output).unwrap();
    let page_id = only_page(&doc);
    assert_eq!(
        media_box(&doc, page_id),
        vec![0.0, 0.0, FOOTER_WIDTH as f32, FOOTER_HEIGHT as f32]
    );

    let image_id = pdf_panels::render::find_first_image(&doc, page_id)
        .unwrap()
        .unwrap();
    let stream = doc.get_object(image_id).unwrap().as_stream().unwrap();
    assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 80);
    assert_eq!(stream.dict.get(b"Height").unwrap().as_i64().unwrap(), 20);

    // Intermediate rasters are removed
    assert_eq!(std::fs::read_dir(workspace.path()).unwrap().count(), 0);
}

#[test]
fn test_optimizer_keeps_footer_without_image() {
    let fixture = Fixture::new();
    let footer = fixture.footer_dir.join("LPfooter.pdf");
    write_footer_pdf(&footer, false);
    let output = fixture.output_dir.join("unused.pdf");
    let workspace = Workspace::create(None).unwrap();

    let result =
        optimize_footer(&footer, &output, &FooterOptimization::default(), &workspace).unwrap();
    assert_eq!(result, footer);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_batch_with_footer_optimization() {
    let fixture = Fixture::new();
    write_footer_pdf(&fixture.footer_dir.join("LPfooter.pdf"), true);
    let mut config = fixture.config();
    config.footer_optimization.enabled = true;

    let report = generate_batch(&fixture.source, "Ivy", &config).await.unwrap();
    assert!(report.is_success());
    assert!(fixture.scratch_is_empty());

    let result = report.succeeded().next().unwrap();
    let expected_width = 1728.0 + 2.0 * 5.6693;
    let expected_footer = FOOTER_HEIGHT as f64 * expected_width / FOOTER_WIDTH as f64;
    assert!((result.footer_height - expected_footer).abs() < 1e-6);
}

#[tokio::test]
async fn test_save_pdf_cleans_and_reloads() {
    let fixture = Fixture::new();
    let footer = fixture.footer_dir.join("LPfooter.pdf");
    write_footer_pdf(&footer, true);

    let mut doc = load_pdf(&footer).await.unwrap();
    // Orphaned object that the cleanup should drop
    doc.add_object(Dictionary::from_iter(vec![("Orphan", Object::Boolean(true))]));
    let before = doc.objects.len();

    let copy = fixture.output_dir.join("copy.pdf");
    save_pdf(doc, &copy).await.unwrap();

    let reloaded = load_pdf(&copy).await.unwrap();
    assert_eq!(reloaded.get_pages().len(), 1);
    assert!(reloaded.objects.len() < before);
}
