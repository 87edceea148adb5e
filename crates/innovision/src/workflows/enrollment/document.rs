use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, CustomPdfConformance, IndirectFontRef, Mm, PdfConformance,
    PdfDocument, PdfLayerReference, Rect, Rgb,
};
use qrcode::{Color as QrColor, QrCode};
use time::OffsetDateTime;

use crate::config::SchoolConfig;

use super::domain::Applicant;

/// Rendering failure; no partial output is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document rendering failed: {0}")]
    Render(String),
}

/// Produces the binary confirmation document for an applicant. Output must
/// depend only on the record so the document can be regenerated on demand.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, applicant: &Applicant) -> Result<Vec<u8>, DocumentError>;
}

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 18.0;
const VALUE_COLUMN_MM: f32 = 72.0;
const FIELD_STEP_MM: f32 = 9.0;
const QR_SIZE_MM: f32 = 34.0;
const QR_ORIGIN_X_MM: f32 = 158.0;
const QR_ORIGIN_Y_MM: f32 = 196.0;

fn navy() -> Color {
    Color::Rgb(Rgb::new(0.059, 0.298, 0.506, None))
}

fn accent() -> Color {
    Color::Rgb(Rgb::new(0.85, 0.62, 0.05, None))
}

fn slate() -> Color {
    Color::Rgb(Rgb::new(0.2, 0.2, 0.2, None))
}

fn gray() -> Color {
    Color::Rgb(Rgb::new(0.4, 0.4, 0.4, None))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

/// A4 confirmation sheet: school identity block, prominent application id,
/// labeled applicant fields, and a scannable code carrying the application id.
pub struct ConfirmationPdfRenderer {
    school: SchoolConfig,
}

impl ConfirmationPdfRenderer {
    pub fn new(school: SchoolConfig) -> Self {
        Self { school }
    }

    fn write_field(
        layer: &PdfLayerReference,
        bold: &IndirectFontRef,
        regular: &IndirectFontRef,
        label: &str,
        value: &str,
        y: f32,
    ) -> f32 {
        layer.set_fill_color(slate());
        layer.use_text(label, 11.0, Mm(MARGIN_MM), Mm(y), bold);
        layer.set_fill_color(gray());
        layer.use_text(value, 11.0, Mm(VALUE_COLUMN_MM), Mm(y), regular);
        y - FIELD_STEP_MM
    }

    fn draw_scannable_code(
        layer: &PdfLayerReference,
        payload: &str,
    ) -> Result<(), DocumentError> {
        let code = QrCode::new(payload.as_bytes())
            .map_err(|err| DocumentError::Render(err.to_string()))?;
        let width = code.width();
        if width == 0 {
            return Err(DocumentError::Render("empty code matrix".to_string()));
        }
        let module = QR_SIZE_MM / width as f32;
        let colors = code.to_colors();

        layer.set_fill_color(black());
        for (index, color) in colors.iter().enumerate() {
            if *color != QrColor::Dark {
                continue;
            }
            let row = index / width;
            let col = index % width;
            let x = QR_ORIGIN_X_MM + col as f32 * module;
            // rows run top-down while PDF y runs bottom-up
            let y = QR_ORIGIN_Y_MM + (width - 1 - row) as f32 * module;
            let rect = Rect::new(Mm(x), Mm(y), Mm(x + module), Mm(y + module))
                .with_mode(PaintMode::Fill);
            layer.add_rect(rect);
        }
        Ok(())
    }
}

impl DocumentRenderer for ConfirmationPdfRenderer {
    fn render(&self, applicant: &Applicant) -> Result<Vec<u8>, DocumentError> {
        let (doc, page, layer) = PdfDocument::new(
            "Fiche d'inscription",
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "fiche",
        );
        // Pinned metadata keeps two renders of the same record byte-identical.
        let doc = doc
            .with_conformance(PdfConformance::Custom(CustomPdfConformance {
                requires_xmp_metadata: false,
                ..Default::default()
            }))
            .with_creation_date(OffsetDateTime::UNIX_EPOCH)
            .with_mod_date(OffsetDateTime::UNIX_EPOCH)
            .with_document_id(applicant.application_id.0.clone());

        let layer = doc.get_page(page).get_layer(layer);
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|err| DocumentError::Render(err.to_string()))?;
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|err| DocumentError::Render(err.to_string()))?;

        layer.set_fill_color(navy());
        layer.use_text(&self.school.name, 24.0, Mm(MARGIN_MM), Mm(272.0), &bold);
        layer.set_fill_color(gray());
        layer.use_text(&self.school.tagline, 11.0, Mm(MARGIN_MM), Mm(264.0), &regular);
        layer.use_text(&self.school.address, 10.0, Mm(MARGIN_MM), Mm(258.0), &regular);
        layer.use_text(
            format!("Tél: {} | Email: {}", self.school.phone, self.school.email),
            10.0,
            Mm(MARGIN_MM),
            Mm(252.0),
            &regular,
        );

        layer.set_fill_color(navy());
        layer.use_text("Fiche d'Inscription", 20.0, Mm(68.0), Mm(238.0), &bold);
        layer.set_fill_color(accent());
        layer.use_text(
            format!("ID de candidature: {}", applicant.application_id.0),
            13.0,
            Mm(52.0),
            Mm(228.0),
            &bold,
        );

        let mut y = 214.0;
        y = Self::write_field(
            &layer,
            &bold,
            &regular,
            "Nom & Prénom:",
            &applicant.full_name,
            y,
        );
        y = Self::write_field(&layer, &bold, &regular, "Email:", &applicant.email, y);
        y = Self::write_field(
            &layer,
            &bold,
            &regular,
            "Date de naissance:",
            &applicant.birth_date.format("%d/%m/%Y").to_string(),
            y,
        );
        y = Self::write_field(
            &layer,
            &bold,
            &regular,
            "Âge:",
            &format!("{} ans", applicant.age),
            y,
        );
        y = Self::write_field(&layer, &bold, &regular, "Wilaya:", &applicant.wilaya, y);
        y = Self::write_field(&layer, &bold, &regular, "Téléphone:", &applicant.phone, y);
        y = Self::write_field(
            &layer,
            &bold,
            &regular,
            "Formation choisie:",
            &applicant.course,
            y,
        );
        y = Self::write_field(
            &layer,
            &bold,
            &regular,
            "Date d'inscription:",
            &applicant
                .created_at
                .date_naive()
                .format("%d/%m/%Y")
                .to_string(),
            y,
        );
        Self::write_field(
            &layer,
            &bold,
            &regular,
            "Langue:",
            &applicant.locale.as_str().to_ascii_uppercase(),
            y,
        );

        Self::draw_scannable_code(&layer, &applicant.application_id.0)?;
        layer.set_fill_color(gray());
        layer.use_text("QR Code ID", 9.0, Mm(QR_ORIGIN_X_MM + 6.0), Mm(QR_ORIGIN_Y_MM - 6.0), &regular);

        layer.use_text(
            format!(
                "Ce document confirme votre inscription à {}.",
                self.school.name
            ),
            10.0,
            Mm(MARGIN_MM),
            Mm(38.0),
            &regular,
        );
        layer.use_text(
            "Conservez cette fiche pour vos dossiers.",
            10.0,
            Mm(MARGIN_MM),
            Mm(32.0),
            &regular,
        );

        doc.save_to_bytes()
            .map_err(|err| DocumentError::Render(err.to_string()))
    }
}
