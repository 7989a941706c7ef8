// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for artifact extraction in the docharvest-document crate.
// Documents are built in memory once, then parsed and extracted per iteration.
//
// Run with: cargo bench -p docharvest-document --features fixtures

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use docharvest_document::fixtures::{DocxBuilder, PdfBuilder, PptxBuilder, tiny_png};
use docharvest_document::{
    DocumentHandle, DocxDocument, Extractor, PdfDocument, PptxDocument,
};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// A 50-paragraph report with a table and two pictures.
fn bench_docx_extraction(c: &mut Criterion) {
    let mut builder = DocxBuilder::new().title("Benchmark report");
    for i in 0..50 {
        builder = builder.paragraph(&format!("Paragraph {i} of the benchmark report."));
    }
    let data = builder
        .hyperlink("source", "https://example.com/source")
        .table(&[&["region", "total"], &["north", "12"], &["south", "7"]])
        .image("chart.png", &tiny_png())
        .image("logo.png", &tiny_png())
        .build();
    let extractor = Extractor::new();

    c.bench_function("extract docx (50 paragraphs)", |b| {
        b.iter(|| {
            let doc = DocxDocument::from_bytes("bench.docx", black_box(&data)).unwrap();
            black_box(extractor.extract(DocumentHandle::Docx(doc)));
        });
    });
}

/// A 20-slide deck sharing one picture.
fn bench_pptx_extraction(c: &mut Criterion) {
    let logo = tiny_png();
    let mut builder = PptxBuilder::new().title("Benchmark deck");
    for i in 0..20 {
        builder = builder.slide(|s| {
            s.text(&format!("Slide {i}"))
                .link("more", "https://example.com/more")
                .image("logo.png", &logo)
        });
    }
    let data = builder.build();
    let extractor = Extractor::new();

    c.bench_function("extract pptx (20 slides)", |b| {
        b.iter(|| {
            let doc = PptxDocument::from_bytes("bench.pptx", black_box(&data)).unwrap();
            black_box(extractor.extract(DocumentHandle::Ppt(doc)));
        });
    });
}

/// Ten grid pages through the layout table heuristic.
fn bench_pdf_extraction(c: &mut Criterion) {
    let mut builder = PdfBuilder::new().title("Benchmark ledger");
    for i in 0..10 {
        builder = builder.grid_page(
            &format!("Ledger page {i}"),
            &[&["item", "qty", "price"], &["bolts", "40", "0.10"], &["nuts", "40", "0.05"]],
        );
    }
    let data = builder.build();
    let extractor = Extractor::new();

    c.bench_function("extract pdf (10 grid pages)", |b| {
        b.iter(|| {
            let doc = PdfDocument::from_bytes("bench.pdf", black_box(&data)).unwrap();
            black_box(extractor.extract(DocumentHandle::Pdf(doc)));
        });
    });
}

criterion_group!(
    benches,
    bench_docx_extraction,
    bench_pptx_extraction,
    bench_pdf_extraction
);
criterion_main!(benches);
