// src/services/pdf.rs

use std::path::PathBuf;
use std::sync::Arc;

use genpdf::{elements, style, Alignment, Element};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use thiserror::Error;

use crate::{
    common::error::AppError,
    models::{
        billing::PartySnapshot,
        invoice::{Invoice, InvoiceLineItem},
    },
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("fonts could not be loaded: {0}")]
    Fonts(String),

    #[error("layout failed: {0}")]
    Layout(String),

    #[error("fallback document failed: {0}")]
    Fallback(String),
}

/// Tudo o que o PDF precisa; montado depois da inserção da fatura.
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    pub invoice: Invoice,
    pub items: Vec<InvoiceLineItem>,
    pub issuer: PartySnapshot,
    pub counterparty: PartySnapshot,
}

/// Renderizador síncrono (CPU); chamado no pool de blocking.
pub trait InvoiceRenderer: Send + Sync {
    fn render(&self, doc: &InvoiceDocument) -> Result<Vec<u8>, RenderError>;
}

// ---
// Renderizador genpdf
// ---

#[derive(Debug, Clone)]
pub struct GenPdfRenderer {
    fonts_dir: PathBuf,
    font_family: String,
}

impl GenPdfRenderer {
    pub fn new(fonts_dir: impl Into<PathBuf>, font_family: impl Into<String>) -> Self {
        Self { fonts_dir: fonts_dir.into(), font_family: font_family.into() }
    }
}

impl InvoiceRenderer for GenPdfRenderer {
    fn render(&self, data: &InvoiceDocument) -> Result<Vec<u8>, RenderError> {
        let invoice = &data.invoice;

        // 1. Fontes
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, &self.font_family, None)
            .map_err(|e| RenderError::Fonts(e.to_string()))?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(format!("Factura {}", invoice.invoice_number));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- CABEÇALHO ---
        doc.push(elements::Paragraph::new("FACTURA").styled(style::Style::new().bold().with_font_size(18)));
        doc.push(elements::Paragraph::new(format!("Nr.: {}", invoice.invoice_number)));
        doc.push(elements::Paragraph::new(format!(
            "Data emiterii: {}",
            invoice.issue_date.format("%d.%m.%Y")
        )));
        doc.push(elements::Paragraph::new(format!(
            "Data scadentei: {}",
            invoice.due_date.format("%d.%m.%Y")
        )));
        doc.push(elements::Break::new(1.5));

        // --- PARTES ---
        let mut parties = elements::TableLayout::new(vec![1, 1]);
        parties
            .row()
            .element(party_block("Furnizor", &data.issuer))
            .element(party_block("Client", &data.counterparty))
            .push()
            .map_err(|e| RenderError::Layout(e.to_string()))?;
        doc.push(parties);
        doc.push(elements::Break::new(2));

        // --- TABELA DE ITENS ---
        // Nr (1), Denumire (6), U.M. (1), Cant. (2), Pret (2), Greutate (2), Valoare (2)
        let mut table = elements::TableLayout::new(vec![1, 6, 1, 2, 2, 2, 2]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let bold = style::Style::new().bold();
        table
            .row()
            .element(elements::Paragraph::new("Nr").styled(bold))
            .element(elements::Paragraph::new("Denumire").styled(bold))
            .element(elements::Paragraph::new("U.M.").styled(bold))
            .element(elements::Paragraph::new("Cant.").styled(bold))
            .element(elements::Paragraph::new("Pret unitar").styled(bold))
            .element(elements::Paragraph::new("Greutate (kg)").styled(bold))
            .element(elements::Paragraph::new("Valoare").styled(bold))
            .push()
            .map_err(|e| RenderError::Layout(e.to_string()))?;

        for item in &data.items {
            table
                .row()
                .element(elements::Paragraph::new(item.line_no.to_string()))
                .element(elements::Paragraph::new(item.description.clone()))
                .element(elements::Paragraph::new(item.unit.clone()))
                .element(elements::Paragraph::new(item.quantity.normalize().to_string()))
                .element(elements::Paragraph::new(format!("{:.2}", item.unit_price)))
                .element(elements::Paragraph::new(format!("{:.2}", item.weight_kg)))
                .element(elements::Paragraph::new(format!("{:.2}", item.line_total)))
                .push()
                .map_err(|e| RenderError::Layout(e.to_string()))?;
        }

        doc.push(table);
        doc.push(elements::Break::new(2));

        // --- TOTAIS ---
        for text in [
            format!("Subtotal: {:.2} {}", invoice.subtotal, invoice.currency),
            format!("TVA ({}%): {:.2} {}", invoice.vat_rate.normalize(), invoice.vat_amount, invoice.currency),
        ] {
            let mut p = elements::Paragraph::new(text);
            p.set_alignment(Alignment::Right);
            doc.push(p);
        }

        let mut total = elements::Paragraph::new(format!(
            "TOTAL DE PLATA: {:.2} {}",
            invoice.total, invoice.currency
        ));
        total.set_alignment(Alignment::Right);
        doc.push(total.styled(style::Style::new().bold().with_font_size(12)));

        // 2. Renderiza para buffer
        let mut buffer = Vec::new();
        doc.render(&mut buffer).map_err(|e| RenderError::Layout(e.to_string()))?;

        Ok(buffer)
    }
}

fn party_block(title: &str, party: &PartySnapshot) -> elements::LinearLayout {
    let mut block = elements::LinearLayout::vertical();
    block.push(elements::Paragraph::new(title.to_string()).styled(style::Style::new().bold()));
    block.push(elements::Paragraph::new(party.display_name().to_string()));

    let optional = [
        party.cui.as_ref().map(|v| format!("CUI: {}", v)),
        party.reg_com.as_ref().map(|v| format!("Reg. Com.: {}", v)),
        Some(party.address()).filter(|a| !a.is_empty()),
        party.bank_name.as_ref().map(|v| format!("Banca: {}", v)),
        party.iban.as_ref().map(|v| format!("IBAN: {}", v)),
        party.email_billing.clone(),
        party.phone_billing.clone(),
    ];
    for line in optional.into_iter().flatten() {
        block.push(elements::Paragraph::new(line).styled(style::Style::new().with_font_size(9)));
    }
    block
}

// ---
// Documento de contingência (lopdf, fonte Type1 embutida no leitor)
// ---

/// Página única com o número da fatura e um aviso. Não depende de arquivos de fonte.
pub fn fallback_document(invoice_number: &str, notice: &str) -> Result<Vec<u8>, RenderError> {
    let lines = [
        format!("Factura {}", invoice_number),
        "Documentul complet nu a putut fi generat.".to_string(),
        truncate(notice, 90),
    ];

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 14.into()]),
        Operation::new("Td", vec![60.into(), 780.into()]),
        Operation::new("TL", vec![18.into()]),
    ];
    for line in &lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(to_latin(line))]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations }
        .encode()
        .map_err(|e| RenderError::Fallback(e.to_string()))?;

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => Object::Reference(font_id),
        },
    });
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        "Contents" => Object::Reference(content_id),
        "Resources" => Object::Reference(resources_id),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).map_err(|e| RenderError::Fallback(e.to_string()))?;
    Ok(output)
}

// Helvetica Type1 sem encoding: diacríticos romenos viram ASCII
fn to_latin(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ă' | 'â' => 'a',
            'Ă' | 'Â' => 'A',
            'î' => 'i',
            'Î' => 'I',
            'ș' | 'ş' => 's',
            'Ș' | 'Ş' => 'S',
            'ț' | 'ţ' => 't',
            'Ț' | 'Ţ' => 'T',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '?',
        })
        .collect()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}

/// Renderiza no pool de blocking. Erro ou panic do renderizador não abortam a emissão:
/// o resultado é o documento de contingência.
pub async fn render_with_fallback(
    renderer: Arc<dyn InvoiceRenderer>,
    doc: InvoiceDocument,
) -> Result<Vec<u8>, AppError> {
    let invoice_number = doc.invoice.invoice_number.clone();

    let notice = match tokio::task::spawn_blocking(move || renderer.render(&doc)).await {
        Ok(Ok(bytes)) => return Ok(bytes),
        Ok(Err(e)) => {
            tracing::warn!("⚠️ Falha ao renderizar fatura {}: {}. Usando PDF de contingência.", invoice_number, e);
            e.to_string()
        }
        Err(join_err) => {
            tracing::error!("🔥 Renderizador de PDF abortou para {}: {}", invoice_number, join_err);
            "renderer aborted".to_string()
        }
    };

    fallback_document(&invoice_number, &notice)
        .map_err(|e| AppError::InternalServerError(anyhow::Error::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use crate::models::invoice::InvoiceStatus;

    fn sample() -> InvoiceDocument {
        let invoice_id = Uuid::new_v4();
        InvoiceDocument {
            invoice: Invoice {
                invoice_id,
                base_company_id: Uuid::new_v4(),
                counterparty_company_id: Uuid::new_v4(),
                source_batch_id: Uuid::new_v4(),
                invoice_number: "INV-2025-000001".into(),
                issue_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                due_date: NaiveDate::from_ymd_opt(2025, 1, 25).unwrap(),
                currency: "RON".into(),
                vat_rate: dec!(19.00),
                subtotal: dec!(3.50),
                vat_amount: dec!(0.67),
                total: dec!(4.17),
                status: InvoiceStatus::Issued,
                pdf_path: None,
                created_at: Utc::now(),
            },
            items: vec![InvoiceLineItem {
                item_id: Uuid::new_v4(),
                invoice_id,
                line_no: 1,
                category_key: "3a".into(),
                description: "Plumb acid (3a)".into(),
                quantity: dec!(10),
                unit: "kg".into(),
                unit_price: dec!(0.35),
                line_total: dec!(3.50),
                weight_kg: dec!(10),
            }],
            issuer: PartySnapshot { company_name: "Baza SRL".into(), ..Default::default() },
            counterparty: PartySnapshot { company_name: "Colector SRL".into(), ..Default::default() },
        }
    }

    struct FailingRenderer;
    impl InvoiceRenderer for FailingRenderer {
        fn render(&self, _doc: &InvoiceDocument) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::Layout("boom".into()))
        }
    }

    struct PanickingRenderer;
    impl InvoiceRenderer for PanickingRenderer {
        fn render(&self, _doc: &InvoiceDocument) -> Result<Vec<u8>, RenderError> {
            panic!("layout overflow")
        }
    }

    #[test]
    fn fallback_is_a_loadable_single_page_pdf() {
        let bytes = fallback_document("INV-2025-000001", "fonts could not be loaded").unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        let text = String::from_utf8_lossy(&doc.get_page_content(doc.page_iter().next().unwrap()).unwrap()).to_string();
        assert!(text.contains("INV-2025-000001"));
    }

    #[test]
    fn missing_fonts_is_a_render_error() {
        let renderer = GenPdfRenderer::new("/nonexistent/fonts", "Roboto");
        assert!(matches!(renderer.render(&sample()), Err(RenderError::Fonts(_))));
    }

    #[test]
    fn diacritics_are_transliterated() {
        assert_eq!(to_latin("Factură ștearsă"), "Factura stearsa");
        assert_eq!(to_latin("€"), "?");
    }

    #[tokio::test]
    async fn renderer_error_falls_back() {
        let bytes = render_with_fallback(Arc::new(FailingRenderer), sample()).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn renderer_panic_falls_back() {
        let bytes = render_with_fallback(Arc::new(PanickingRenderer), sample()).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
