use super::articles::{ArticleDetector, DetectionMethod, PARSE_ISSUE_NO_ARTICLES};
use super::html::html_to_text;
use super::layout::{LayoutReconstructor, detect_column_boundary};
use super::run::build_document;
use super::transitory::TransitorySplitter;
use crate::model::{PageWords, PositionedWord, SourceEntry};

fn word(text: &str, x0: f64, x1: f64, top: f64, bottom: f64) -> PositionedWord {
    PositionedWord {
        text: text.to_string(),
        x0,
        x1,
        top,
        bottom,
    }
}

fn source_entry(id: &str) -> SourceEntry {
    SourceEntry {
        id: id.to_string(),
        title: "Ley de Prueba".to_string(),
        doc_type: "LEY".to_string(),
        source: "DOF".to_string(),
        jurisdiction: "FEDERAL".to_string(),
        url: "https://example.gob.mx/ley.pdf".to_string(),
        publication_date: Some("2020-01-01".to_string()),
        status: Some("vigente".to_string()),
    }
}

#[test]
fn page_to_text_groups_jittered_words_into_one_line() {
    let reconstructor = LayoutReconstructor::new().expect("layout regexes compile");
    let page = PageWords {
        width: 600.0,
        words: vec![
            word("Disposición", 75.0, 140.0, 10.8, 20.8),
            word("Artículo", 10.0, 60.0, 10.0, 20.0),
            word("1", 65.0, 70.0, 11.5, 21.5),
        ],
        text: None,
    };

    assert_eq!(reconstructor.page_to_text(&page), "Artículo 1 Disposición");
}

#[test]
fn page_to_text_tightens_punctuation_and_strips_soft_hyphens() {
    let reconstructor = LayoutReconstructor::new().expect("layout regexes compile");
    let page = PageWords {
        width: 600.0,
        words: vec![
            word("ley", 10.0, 35.0, 10.0, 20.0),
            word(",", 40.0, 42.0, 10.0, 20.0),
            word("artícu\u{00ad}lo", 50.0, 110.0, 10.0, 20.0),
        ],
        text: None,
    };

    assert_eq!(reconstructor.page_to_text(&page), "ley, artículo");
}

#[test]
fn page_to_text_inserts_paragraph_break_on_large_vertical_gap() {
    let reconstructor = LayoutReconstructor::new().expect("layout regexes compile");
    let page = PageWords {
        width: 600.0,
        words: vec![
            word("Primera", 10.0, 60.0, 10.0, 20.0),
            word("línea", 65.0, 100.0, 10.0, 20.0),
            word("Segunda", 10.0, 60.0, 60.0, 70.0),
            word("línea", 65.0, 100.0, 60.0, 70.0),
        ],
        text: None,
    };

    assert_eq!(
        reconstructor.page_to_text(&page),
        "Primera línea\n\nSegunda línea"
    );
}

#[test]
fn page_to_text_falls_back_to_plain_text_when_no_words() {
    let reconstructor = LayoutReconstructor::new().expect("layout regexes compile");
    let page = PageWords {
        width: 600.0,
        words: Vec::new(),
        text: Some("  Uno  \n\n   \n  Dos  \n".to_string()),
    };

    assert_eq!(reconstructor.page_to_text(&page), "Uno\nDos");
}

#[test]
fn column_boundary_rejected_for_indented_title_gap() {
    // Single-column page: one centered title word creates the widest x-gap,
    // but almost every word sits left of the candidate boundary.
    let mut words = vec![word("TÍTULO", 300.0, 350.0, 10.0, 20.0)];
    for row in 0..2 {
        let top = 30.0 + row as f64 * 20.0;
        for col in 0..4 {
            let x0 = 50.0 + col as f64 * 50.0;
            words.push(word("palabra", x0, x0 + 40.0, top, top + 10.0));
        }
    }

    assert!(detect_column_boundary(&words, 600.0).is_none());
}

#[test]
fn column_boundary_accepted_for_balanced_two_column_page() {
    let words = vec![
        word("Izquierda", 50.0, 130.0, 10.0, 20.0),
        word("abajo", 50.0, 100.0, 30.0, 40.0),
        word("Derecha", 330.0, 400.0, 10.0, 20.0),
        word("fondo", 330.0, 390.0, 30.0, 40.0),
    ];

    let boundary = detect_column_boundary(&words, 600.0).expect("boundary detected");
    assert!(boundary > 130.0 && boundary < 330.0);
}

#[test]
fn page_to_text_emits_left_column_before_right_column() {
    let reconstructor = LayoutReconstructor::new().expect("layout regexes compile");
    let page = PageWords {
        width: 600.0,
        words: vec![
            word("Derecha", 330.0, 400.0, 10.0, 20.0),
            word("Izquierda", 50.0, 130.0, 10.0, 20.0),
            word("fondo", 330.0, 390.0, 30.0, 40.0),
            word("abajo", 50.0, 100.0, 30.0, 40.0),
        ],
        text: None,
    };

    assert_eq!(
        reconstructor.page_to_text(&page),
        "Izquierda\nabajo\n\nDerecha\nfondo"
    );
}

#[test]
fn sequential_detection_stops_at_numbering_gap() {
    let detector = ArticleDetector::new().expect("article regexes compile");
    let transitory = TransitorySplitter::new().expect("transitory regexes compile");
    let text = "Artículo 1 Uno.\nArtículo 2 Dos.\nArtículo 4 Cuatro.";

    let split = detector.split_articles_and_tail(text, &transitory);

    assert_eq!(split.detection_method, DetectionMethod::Sequential);
    assert_eq!(split.articles.len(), 2);
    assert_eq!(split.articles[0].number, "1");
    assert_eq!(split.articles[1].number, "2");
    assert!(split.articles[1].text.contains("Artículo 4"));
}

#[test]
fn sequential_detection_ignores_inline_article_references() {
    let detector = ArticleDetector::new().expect("article regexes compile");
    let transitory = TransitorySplitter::new().expect("transitory regexes compile");
    let text = "Artículo 1 Como dispone el Artículo 27 de otra ley.\nArtículo 2 Fin.";

    let split = detector.split_articles_and_tail(text, &transitory);

    assert_eq!(split.articles.len(), 2);
    assert!(split.articles[0].text.contains("Artículo 27"));
    assert_eq!(split.articles[1].text, "Fin.");
}

#[test]
fn relaxed_detection_resolves_ordinal_words() {
    let detector = ArticleDetector::new().expect("article regexes compile");
    let transitory = TransitorySplitter::new().expect("transitory regexes compile");
    let text = "ARTICULO PRIMERO.- Disposición uno.\n\nARTICULO SEGUNDO.- Disposición dos.";

    let split = detector.split_articles_and_tail(text, &transitory);

    assert_eq!(split.detection_method, DetectionMethod::Relaxed);
    assert_eq!(split.articles.len(), 2);
    assert_eq!(split.articles[0].number, "1");
    assert_eq!(split.articles[1].number, "2");
}

#[test]
fn missing_article_headers_set_parse_issue() {
    let detector = ArticleDetector::new().expect("article regexes compile");
    let transitory = TransitorySplitter::new().expect("transitory regexes compile");
    let text = "Texto administrativo sin estructura de articulado.";

    let split = detector.split_articles_and_tail(text, &transitory);

    assert!(split.articles.is_empty());
    assert_eq!(split.preamble, text);
    assert_eq!(split.parse_issue.as_deref(), Some(PARSE_ISSUE_NO_ARTICLES));
    assert_eq!(split.detection_method, DetectionMethod::None);
}

#[test]
fn articles_truncate_before_transitorios_heading() {
    let detector = ArticleDetector::new().expect("article regexes compile");
    let transitory = TransitorySplitter::new().expect("transitory regexes compile");
    let text = "Artículo 1 Disposición general.\n\nArtículo 2 Otra disposición.\n\nArtículos Transitorios\n\nPRIMERO.- Entra en vigor.";

    let split = detector.split_articles_and_tail(text, &transitory);

    assert_eq!(split.articles.len(), 2);
    assert_eq!(split.articles[0].text, "Disposición general.");
    assert_eq!(split.articles[1].text, "Otra disposición.");
    assert!(split.tail.starts_with("Artículos Transitorios"));

    let (items, preamble) = transitory.split_region(&split.tail);
    assert_eq!(items.len(), 1);
    assert!(items[0].label.starts_with("PRIMERO"));
    assert!(items[0].text.is_empty());
    assert_eq!(preamble, "Artículos Transitorios");
}

#[test]
fn find_root_heading_skips_match_at_mid_line_offset() {
    let transitory = TransitorySplitter::new().expect("transitory regexes compile");
    let text = "los transitorios\nTransitorios\nPRIMERO. Entra en vigor.";

    assert_eq!(transitory.find_root_heading(text, 4), Some(17));
}

#[test]
fn transitory_region_without_markers_is_preamble() {
    let transitory = TransitorySplitter::new().expect("transitory regexes compile");
    let (items, preamble) =
        transitory.split_region("Transitorios\nSin elementos estructurados aquí");

    assert!(items.is_empty());
    assert_eq!(
        preamble,
        "Transitorios\nSin elementos estructurados aquí"
    );
}

#[test]
fn transitory_items_carry_first_line_labels_and_bodies() {
    let transitory = TransitorySplitter::new().expect("transitory regexes compile");
    let tail = "Artículos Transitorios\nPRIMERO.- El presente decreto entrará en vigor.\nSEGUNDO.- Se derogan las disposiciones.\nDetalle adicional.";

    let (items, _) = transitory.split_region(tail);

    assert_eq!(items.len(), 2);
    assert_eq!(
        items[0].label,
        "PRIMERO.- El presente decreto entrará en vigor."
    );
    assert!(items[0].text.is_empty());
    assert!(items[1].label.starts_with("SEGUNDO"));
    assert_eq!(items[1].text, "Detalle adicional.");
}

#[test]
fn html_to_text_drops_scripts_and_keeps_block_breaks() {
    let html = "<html><body><p>Artículo 1 Uno.</p><script>var x = 1;</script><p>Artículo 2 Dos.</p></body></html>";

    let text = html_to_text(html);

    assert_eq!(text, "Artículo 1 Uno.\nArtículo 2 Dos.");
    assert!(!text.contains("var x"));
}

#[test]
fn build_document_refines_empty_text_parse_issue() {
    let detector = ArticleDetector::new().expect("article regexes compile");
    let transitory = TransitorySplitter::new().expect("transitory regexes compile");

    let doc = build_document(&source_entry("w001"), String::new(), &detector, &transitory);

    assert_eq!(
        doc.metadata.get("parse_issue").and_then(|v| v.as_str()),
        Some("ocr_pending_empty_pdf")
    );
    assert_eq!(
        doc.metadata.get("num_articles").and_then(|v| v.as_str()),
        Some("0")
    );
    assert!(doc.articles.is_empty());
}

#[test]
fn build_document_records_preamble_and_detection_method() {
    let detector = ArticleDetector::new().expect("article regexes compile");
    let transitory = TransitorySplitter::new().expect("transitory regexes compile");
    let text = "LEY DE PRUEBA\nArtículo 1 Disposición inicial.".to_string();

    let doc = build_document(&source_entry("w002"), text, &detector, &transitory);

    assert_eq!(doc.articles.len(), 1);
    assert_eq!(
        doc.metadata.get("preamble").and_then(|v| v.as_str()),
        Some("LEY DE PRUEBA")
    );
    assert_eq!(
        doc.metadata
            .get("detection_method")
            .and_then(|v| v.as_str()),
        Some("sequential")
    );
    assert!(doc.metadata.get("parse_issue").is_none());
}
