//! Rendered documents: Annex XIII statements, invoice sheets and job cards
//!
//! Documents are rendered from embedded Tera templates to Markdown or
//! standalone HTML and written under `documents/rendered/`.

pub mod templates;

use chrono::{Local, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::lab::{Lab, LabError};
use crate::core::profile::{BankAccount, LabProfile, ProfileError};
use crate::entities::dentist::Dentist;
use crate::entities::document::{Document, DocumentFormat, DocumentKind};
use crate::entities::invoice::Invoice;
use crate::entities::material::Material;
use crate::entities::product::Product;
use crate::entities::qc::{QcVerdict, QualityControl};
use crate::entities::worksheet::{Worksheet, WorksheetStatus};
use crate::fdi::{render_svg, ChartLayout, DentitionMode};

pub use templates::TemplateRenderer;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Lab(#[from] LabError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("template error: {0}")]
    Template(String),

    #[error("worksheet {worksheet} is {status}; Annex XIII statements need a QC-approved or delivered worksheet")]
    NotApproved {
        worksheet: String,
        status: WorksheetStatus,
    },

    #[error("worksheet {0} has no prescribing dentist")]
    NoDentist(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Hex SHA-256 of rendered content
pub fn checksum(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

#[derive(Serialize)]
struct ManufacturerCtx {
    name: String,
    address: Vec<String>,
    country: Option<String>,
    srn: Option<String>,
}

#[derive(Serialize)]
struct PrescriberCtx {
    name: String,
    practice: Option<String>,
    license_number: Option<String>,
    address: Vec<String>,
}

#[derive(Serialize)]
struct WorksheetCtx {
    id: String,
    title: String,
    order: Option<String>,
    patient_ref: String,
}

#[derive(Serialize)]
struct DeviceCtx {
    description: String,
    work: String,
    teeth: String,
    shade: String,
}

#[derive(Serialize)]
struct MaterialCtx {
    name: String,
    manufacturer: String,
    ce_reference: String,
    lots: String,
}

#[derive(Serialize)]
struct QcCtx {
    id: String,
    inspector: String,
    date: String,
}

#[derive(Serialize)]
struct AnnexContext {
    document_id: String,
    date: String,
    manufacturer: ManufacturerCtx,
    prescriber: PrescriberCtx,
    worksheet: WorksheetCtx,
    devices: Vec<DeviceCtx>,
    materials: Vec<MaterialCtx>,
    gspr_exceptions: Vec<String>,
    qc: Option<QcCtx>,
    signatory: String,
}

/// Document service bound to one lab
pub struct Documents<'a> {
    lab: &'a Lab,
    profile: LabProfile,
    renderer: TemplateRenderer,
}

impl<'a> Documents<'a> {
    pub fn new(lab: &'a Lab, profile: LabProfile) -> Result<Self, DocumentError> {
        Ok(Self {
            lab,
            profile,
            renderer: TemplateRenderer::new()?,
        })
    }

    pub fn open(lab: &'a Lab) -> Result<Self, DocumentError> {
        Self::new(lab, LabProfile::load(lab)?)
    }

    /// Generate the Annex XIII statement for a worksheet and link it
    ///
    /// Writes the rendered file and a DOC record, then saves the worksheet
    /// with `annex_xiii` pointing at the new record.
    pub fn annex_xiii(
        &self,
        ws: &mut Worksheet,
        format: DocumentFormat,
        gspr_exceptions: Vec<String>,
        author: &str,
    ) -> Result<Document, DocumentError> {
        if !matches!(
            ws.status,
            WorksheetStatus::QcApproved | WorksheetStatus::Delivered
        ) {
            return Err(DocumentError::NotApproved {
                worksheet: ws.id.to_string(),
                status: ws.status,
            });
        }
        let dentist_id = ws
            .dentist
            .clone()
            .ok_or_else(|| DocumentError::NoDentist(ws.id.to_string()))?;
        let dentist: Dentist = self.lab.load(&dentist_id)?;

        let doc_id = EntityId::new(EntityPrefix::Doc);
        let context = AnnexContext {
            document_id: doc_id.to_string(),
            date: Local::now().date_naive().to_string(),
            manufacturer: ManufacturerCtx {
                name: self.profile.name.clone(),
                address: self.profile.address.clone(),
                country: self.profile.country.clone(),
                srn: self.profile.srn.clone(),
            },
            prescriber: PrescriberCtx {
                name: dentist.title.clone(),
                practice: dentist.practice.clone(),
                license_number: dentist.license_number.clone(),
                address: dentist.address.clone(),
            },
            worksheet: WorksheetCtx {
                id: ws.id.to_string(),
                title: ws.title.clone(),
                order: ws.order.as_ref().map(|o| o.to_string()),
                patient_ref: ws
                    .patient_ref
                    .clone()
                    .unwrap_or_else(|| ws.id.short()),
            },
            devices: self.device_lines(ws)?,
            materials: self.material_lines(ws)?,
            gspr_exceptions,
            qc: self.last_passed_qc(ws)?,
            signatory: self.profile.responsible_person.clone(),
        };

        let template = match format {
            DocumentFormat::Markdown => templates::ANNEX_XIII_MD,
            DocumentFormat::Html => templates::ANNEX_XIII_HTML,
        };
        let rendered = self.renderer.render(template, &context)?;

        let file = self.write_rendered(
            &format!("annex-xiii-{}-{}.{}", ws.id, doc_id.short(), format.extension()),
            &rendered,
        )?;

        let now = Utc::now();
        let doc = Document {
            id: doc_id,
            title: format!("Annex XIII statement {}", ws.id.short()),
            kind: DocumentKind::AnnexXiii,
            worksheet: ws.id.clone(),
            format,
            file: self.lab.relative(&file).display().to_string(),
            sha256: checksum(&rendered),
            signatory: Some(self.profile.responsible_person.clone()),
            generated_at: now,
            created: now,
            author: author.to_string(),
            entity_revision: 1,
        };
        self.lab.save(&doc)?;

        ws.annex_xiii = Some(doc.id.clone());
        ws.entity_revision += 1;
        self.lab.save(ws)?;

        tracing::info!(worksheet = %ws.id, document = %doc.id, file = %doc.file, "generated Annex XIII statement");
        Ok(doc)
    }

    /// Recompute the checksum of a document's rendered file
    pub fn verify(&self, doc: &Document) -> Result<bool, DocumentError> {
        let content = fs::read_to_string(self.lab.root().join(&doc.file))
            .map_err(|e| DocumentError::Io(e.to_string()))?;
        Ok(checksum(&content) == doc.sha256)
    }

    fn device_lines(&self, ws: &Worksheet) -> Result<Vec<DeviceCtx>, DocumentError> {
        // (product, work, shade) -> teeth
        let mut groups: BTreeMap<(Option<EntityId>, String, String), Vec<String>> =
            BTreeMap::new();
        for t in &ws.teeth {
            groups
                .entry((
                    t.product.clone(),
                    t.work.to_string(),
                    t.shade.clone().unwrap_or_default(),
                ))
                .or_default()
                .push(t.tooth.to_string());
        }

        let mut lines = Vec::new();
        for ((product, work, shade), teeth) in groups {
            let description = match product {
                Some(id) => {
                    let product: Product = self.lab.load(&id)?;
                    product.describe().to_string()
                }
                None => format!("Custom-made {}", work.replace('_', " ")),
            };
            lines.push(DeviceCtx {
                description,
                work,
                teeth: teeth.join(", "),
                shade,
            });
        }
        Ok(lines)
    }

    fn material_lines(&self, ws: &Worksheet) -> Result<Vec<MaterialCtx>, DocumentError> {
        let mut lots: BTreeMap<EntityId, Vec<String>> = BTreeMap::new();
        for c in ws.active_consumptions() {
            let entry = lots.entry(c.material.clone()).or_default();
            if !entry.contains(&c.lot_number) {
                entry.push(c.lot_number.clone());
            }
        }

        let mut lines = Vec::new();
        for (material_id, numbers) in lots {
            let material: Material = self.lab.load(&material_id)?;
            lines.push(MaterialCtx {
                name: material.title,
                manufacturer: material.manufacturer.unwrap_or_default(),
                ce_reference: material.ce_reference.unwrap_or_default(),
                lots: numbers.join(", "),
            });
        }
        Ok(lines)
    }

    fn last_passed_qc(&self, ws: &Worksheet) -> Result<Option<QcCtx>, DocumentError> {
        for id in ws.qc_records.iter().rev() {
            let qc: QualityControl = self.lab.load(id)?;
            if qc.verdict == QcVerdict::Pass {
                return Ok(Some(QcCtx {
                    id: qc.id.short(),
                    inspector: qc.inspector,
                    date: qc.inspected_at.date_naive().to_string(),
                }));
            }
        }
        Ok(None)
    }

    /// Markdown invoice with totals and the primary bank account
    pub fn invoice_sheet(&self, invoice: &Invoice) -> Result<String, DocumentError> {
        #[derive(Serialize)]
        struct LabCtx<'p> {
            name: &'p str,
            address: &'p [String],
            vat_id: Option<&'p str>,
        }
        #[derive(Serialize)]
        struct DentistCtx {
            name: String,
            address: Vec<String>,
        }
        #[derive(Serialize)]
        struct LineCtx {
            description: String,
            quantity: String,
            unit_price: String,
            vat_rate: String,
            net: String,
        }
        #[derive(Serialize)]
        struct BreakdownCtx {
            rate: String,
            base: String,
            vat: String,
        }
        #[derive(Serialize)]
        struct TotalsCtx {
            net: String,
            vat: String,
            total: String,
            breakdown: Vec<BreakdownCtx>,
        }
        #[derive(Serialize)]
        struct InvoiceCtx<'p> {
            number: Option<String>,
            issue_date: Option<String>,
            due_date: Option<String>,
            currency: String,
            lab: LabCtx<'p>,
            dentist: DentistCtx,
            lines: Vec<LineCtx>,
            totals: TotalsCtx,
            bank: Option<&'p BankAccount>,
        }

        let dentist: Dentist = self.lab.load(&invoice.dentist)?;
        let totals = invoice.totals();
        let context = InvoiceCtx {
            number: invoice.number.clone(),
            issue_date: invoice.issue_date.map(|d| d.to_string()),
            due_date: invoice.due_date.map(|d| d.to_string()),
            currency: invoice.currency.clone(),
            lab: LabCtx {
                name: &self.profile.name,
                address: &self.profile.address,
                vat_id: self.profile.vat_id.as_deref(),
            },
            dentist: DentistCtx {
                name: dentist.display_name(),
                address: dentist.address,
            },
            lines: invoice
                .lines
                .iter()
                .map(|l| LineCtx {
                    description: l.description.clone(),
                    quantity: l.quantity.normalize().to_string(),
                    unit_price: format!("{:.2}", l.unit_price),
                    vat_rate: l.vat_rate.normalize().to_string(),
                    net: format!("{:.2}", l.net()),
                })
                .collect(),
            totals: TotalsCtx {
                net: format!("{:.2}", totals.net),
                vat: format!("{:.2}", totals.vat),
                total: format!("{:.2}", totals.total),
                breakdown: totals
                    .breakdown
                    .iter()
                    .map(|b| BreakdownCtx {
                        rate: b.rate.normalize().to_string(),
                        base: format!("{:.2}", b.base),
                        vat: format!("{:.2}", b.vat),
                    })
                    .collect(),
            },
            bank: self.profile.primary_account(),
        };
        self.renderer.render(templates::INVOICE_MD, &context)
    }

    /// Markdown job card; the tooth chart is written next to it as SVG
    pub fn worksheet_card(&self, ws: &Worksheet) -> Result<(String, PathBuf), DocumentError> {
        #[derive(Serialize)]
        struct ToothCtx {
            tooth: String,
            work: String,
            product: String,
            shade: String,
            notes: String,
        }
        #[derive(Serialize)]
        struct PlanCtx {
            name: String,
            planned: String,
            lots: String,
        }
        #[derive(Serialize)]
        struct HistoryCtx {
            at: String,
            from: String,
            to: String,
            by: String,
            comment: Option<String>,
        }
        #[derive(Serialize)]
        struct CardCtx {
            id: String,
            title: String,
            status: String,
            dentist: String,
            patient_ref: String,
            technician: String,
            due_date: String,
            chart_file: String,
            teeth: Vec<ToothCtx>,
            materials: Vec<PlanCtx>,
            history: Vec<HistoryCtx>,
        }

        let layout = ChartLayout::new(DentitionMode::covering(&ws.tooth_numbers()));
        let svg = render_svg(&layout, &ws.chart_marks());
        let chart_name = format!("chart-{}.svg", ws.id);
        self.write_rendered(&chart_name, &svg)?;

        let dentist = match &ws.dentist {
            Some(id) => self
                .lab
                .load::<Dentist>(id)
                .map(|d| d.display_name())
                .unwrap_or_else(|_| id.to_string()),
            None => String::new(),
        };

        let mut teeth = Vec::new();
        for t in &ws.teeth {
            let product = match &t.product {
                Some(id) => self
                    .lab
                    .load::<Product>(id)
                    .map(|p| p.code)
                    .unwrap_or_else(|_| id.short()),
                None => String::new(),
            };
            teeth.push(ToothCtx {
                tooth: t.tooth.to_string(),
                work: t.work.to_string(),
                product,
                shade: t.shade.clone().unwrap_or_default(),
                notes: t.notes.clone().unwrap_or_default(),
            });
        }

        let mut materials = Vec::new();
        for req in &ws.materials {
            let name = self
                .lab
                .load::<Material>(&req.material)
                .map(|m| format!("{} ({})", m.title, m.unit))
                .unwrap_or_else(|_| req.material.to_string());
            let lots: Vec<String> = ws
                .active_consumptions()
                .filter(|c| c.material == req.material)
                .map(|c| format!("{} x{}", c.lot_number, c.quantity.normalize()))
                .collect();
            materials.push(PlanCtx {
                name,
                planned: req.quantity.normalize().to_string(),
                lots: lots.join(", "),
            });
        }

        let context = CardCtx {
            id: ws.id.to_string(),
            title: ws.title.clone(),
            status: ws.status.to_string(),
            dentist,
            patient_ref: ws.patient_ref.clone().unwrap_or_default(),
            technician: ws.technician.clone().unwrap_or_default(),
            due_date: ws.due_date.map(|d| d.to_string()).unwrap_or_default(),
            chart_file: chart_name,
            teeth,
            materials,
            history: ws
                .history
                .iter()
                .map(|h| HistoryCtx {
                    at: h.at.format("%Y-%m-%d %H:%M").to_string(),
                    from: h.from.to_string(),
                    to: h.to.to_string(),
                    by: h.by.clone(),
                    comment: h.comment.clone(),
                })
                .collect(),
        };
        let markdown = self.renderer.render(templates::WORKSHEET_MD, &context)?;
        let path = self.write_rendered(&format!("worksheet-{}.md", ws.id), &markdown)?;
        Ok((markdown, path))
    }

    fn write_rendered(&self, name: &str, content: &str) -> Result<PathBuf, DocumentError> {
        let dir = self.lab.rendered_dir();
        fs::create_dir_all(&dir).map_err(|e| DocumentError::Io(e.to_string()))?;
        let path = dir.join(name);
        fs::write(&path, content).map_err(|e| DocumentError::Io(e.to_string()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::invoice::InvoiceLine;
    use crate::entities::lot::MaterialLot;
    use crate::entities::qc::QcCheck;
    use crate::entities::worksheet::{LotConsumption, ToothWork, WorkKind};
    use crate::fdi::ToothNumber;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn setup(lab: &Lab) -> Worksheet {
        let mut dentist = Dentist::new("Dr. Maja Horvat".to_string(), "ana".to_string());
        dentist.practice = Some("Smile Studio".to_string());
        dentist.license_number = Some("HK-1234".to_string());
        lab.save(&dentist).unwrap();

        let mut product = Product::new(
            "ZR-CR".to_string(),
            "Zirconia crown".to_string(),
            dec!(120),
            "ana".to_string(),
        );
        product.device_description = Some("Monolithic zirconia crown".to_string());
        lab.save(&product).unwrap();

        let mut material =
            Material::new("Katana UTML".to_string(), "disc".to_string(), "ana".to_string());
        material.manufacturer = Some("Kuraray".to_string());
        material.ce_reference = Some("CE 0197".to_string());
        lab.save(&material).unwrap();
        let lot = MaterialLot::receive(
            material.id.clone(),
            "ZR-2231".to_string(),
            chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            dec!(5),
            "ana".to_string(),
        );
        lab.save(&lot).unwrap();

        let mut ws = Worksheet::new("Crown 36".to_string(), "ana".to_string());
        ws.dentist = Some(dentist.id.clone());
        ws.patient_ref = Some("PT-0042".to_string());
        ws.set_tooth(ToothWork {
            tooth: ToothNumber::try_from(36).unwrap(),
            work: WorkKind::Crown,
            product: Some(product.id.clone()),
            shade: Some("A2".to_string()),
            notes: None,
        });
        ws.consumptions.push(LotConsumption {
            material: material.id.clone(),
            lot: lot.id.clone(),
            lot_number: lot.lot_number.clone(),
            quantity: dec!(1),
            consumed_at: Utc::now(),
            returned: false,
        });

        let qc = QualityControl::new(
            ws.id.clone(),
            "ivan".to_string(),
            vec![QcCheck {
                item: "fit".to_string(),
                passed: true,
                note: None,
            }],
            QcVerdict::Pass,
            None,
        );
        lab.save(&qc).unwrap();
        ws.qc_records.push(qc.id);
        ws.status = WorksheetStatus::QcApproved;
        lab.save(&ws).unwrap();
        ws
    }

    #[test]
    fn test_checksum_is_sha256_hex() {
        assert_eq!(
            checksum("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_annex_xiii_markdown() {
        let tmp = tempdir().unwrap();
        let lab = Lab::init(tmp.path()).unwrap();
        let mut ws = setup(&lab);
        let docs = Documents::open(&lab).unwrap();

        let doc = docs
            .annex_xiii(&mut ws, DocumentFormat::Markdown, Vec::new(), "ana")
            .unwrap();
        assert_eq!(ws.annex_xiii, Some(doc.id.clone()));
        assert_eq!(doc.signatory.as_deref(), Some("Lab Manager"));
        assert!(docs.verify(&doc).unwrap());

        let content = fs::read_to_string(lab.root().join(&doc.file)).unwrap();
        assert!(content.contains("Annex XIII"));
        assert!(content.contains("My Dental Lab"));
        assert!(content.contains("Dr. Maja Horvat, Smile Studio"));
        assert!(content.contains("HK-1234"));
        assert!(content.contains("PT-0042"));
        assert!(content.contains("Monolithic zirconia crown"));
        assert!(content.contains("| 36 |"));
        assert!(content.contains("ZR-2231"));
        assert!(content.contains("Kuraray"));
        assert!(content.contains("Annex I"));
        assert!(content.contains("Signed: Lab Manager"));

        let saved: Worksheet = lab.load(&ws.id).unwrap();
        assert_eq!(saved.annex_xiii, Some(doc.id));
    }

    #[test]
    fn test_annex_xiii_html_escapes() {
        let tmp = tempdir().unwrap();
        let lab = Lab::init(tmp.path()).unwrap();
        let mut ws = setup(&lab);
        ws.title = "Crown <36>".to_string();
        let docs = Documents::open(&lab).unwrap();

        let doc = docs
            .annex_xiii(
                &mut ws,
                DocumentFormat::Html,
                vec!["GSPR 10.4.1 (cobalt content)".to_string()],
                "ana",
            )
            .unwrap();
        assert!(doc.file.ends_with(".html"));
        let content = fs::read_to_string(lab.root().join(&doc.file)).unwrap();
        assert!(content.contains("<!DOCTYPE html>"));
        assert!(content.contains("Crown &lt;36&gt;"));
        assert!(content.contains("GSPR 10.4.1"));
    }

    #[test]
    fn test_annex_requires_approval() {
        let tmp = tempdir().unwrap();
        let lab = Lab::init(tmp.path()).unwrap();
        let mut ws = setup(&lab);
        ws.status = WorksheetStatus::QcPending;
        let docs = Documents::open(&lab).unwrap();
        assert!(matches!(
            docs.annex_xiii(&mut ws, DocumentFormat::Markdown, Vec::new(), "ana"),
            Err(DocumentError::NotApproved { .. })
        ));
    }

    #[test]
    fn test_invoice_sheet() {
        let tmp = tempdir().unwrap();
        let lab = Lab::init(tmp.path()).unwrap();
        let ws = setup(&lab);
        let dentist = ws.dentist.clone().unwrap();
        let mut invoice = Invoice::new(dentist, "EUR".to_string(), "ana".to_string());
        invoice.number = Some("R2026-0007".to_string());
        invoice.lines.push(InvoiceLine {
            description: "ZR-CR Zirconia crown".to_string(),
            worksheet: Some(ws.id.clone()),
            product: None,
            quantity: dec!(2),
            unit_price: dec!(120),
            vat_rate: dec!(25),
        });

        let sheet = Documents::open(&lab).unwrap().invoice_sheet(&invoice).unwrap();
        assert!(sheet.contains("Invoice R2026-0007"));
        assert!(sheet.contains("240.00"));
        assert!(sheet.contains("60.00"));
        assert!(sheet.contains("300.00 EUR"));
    }

    #[test]
    fn test_worksheet_card_writes_chart() {
        let tmp = tempdir().unwrap();
        let lab = Lab::init(tmp.path()).unwrap();
        let ws = setup(&lab);
        let (markdown, path) = Documents::open(&lab).unwrap().worksheet_card(&ws).unwrap();
        assert!(path.exists());
        assert!(markdown.contains(&format!("chart-{}.svg", ws.id)));
        assert!(markdown.contains("| 36 | crown | ZR-CR | A2 |"));
        assert!(lab
            .rendered_dir()
            .join(format!("chart-{}.svg", ws.id))
            .exists());
    }
}
