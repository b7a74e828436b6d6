//! Integration tests for the dlab CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// dlab command running inside the lab as `user`
fn dlab_as(tmp: &TempDir, user: &str) -> Command {
    let mut cmd = Command::cargo_bin("dlab").unwrap();
    cmd.current_dir(tmp.path())
        .env("DLAB_USER", user)
        .env("DLAB_AUTHOR", user)
        .env("XDG_CONFIG_HOME", tmp.path().join(".xdg"))
        .env_remove("RUST_LOG");
    cmd
}

fn dlab(tmp: &TempDir) -> Command {
    dlab_as(tmp, "ana")
}

fn setup_lab() -> TempDir {
    let tmp = TempDir::new().unwrap();
    dlab(&tmp).arg("init").assert().success();
    tmp
}

/// Run a creating command with `-f id` and return the new ID
fn create(tmp: &TempDir, user: &str, args: &[&str]) -> String {
    let output = dlab_as(tmp, user)
        .args(args)
        .args(["-f", "id"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn json(tmp: &TempDir, args: &[&str]) -> serde_json::Value {
    let output = dlab(tmp).args(args).args(["-f", "json"]).output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

/// Decimals serialize as strings; accept numbers too
fn number(value: &serde_json::Value) -> f64 {
    value
        .as_str()
        .map(|s| s.parse().unwrap())
        .or_else(|| value.as_f64())
        .unwrap()
}

struct Catalog {
    dentist: String,
    material: String,
    lot: String,
}

/// Dentist, a zirconia disc lot of 10 units and a crown using 1 unit per tooth
fn setup_catalog(tmp: &TempDir) -> Catalog {
    let dentist = create(
        tmp,
        "ana",
        &["dentist", "new", "--name", "Dr. Maja Horvat", "--practice", "Smile"],
    );
    let material = create(
        tmp,
        "ana",
        &[
            "material", "new", "--title", "Zirconia disc", "--unit", "pcs", "--category",
            "zirconia", "--ce", "CE 0123",
        ],
    );
    let lot = create(
        tmp,
        "ana",
        &[
            "lot", "receive", "--material", &material, "--lot", "ZR-001", "--quantity", "10",
            "--arrival", "2026-01-10",
        ],
    );
    create(
        tmp,
        "ana",
        &[
            "product",
            "new",
            "--code",
            "ZR-CR",
            "--title",
            "Zirconia crown",
            "--price",
            "120",
            "--material",
            &format!("{}=1", material),
        ],
    );
    Catalog {
        dentist,
        material,
        lot,
    }
}

/// Draft worksheet for the catalog dentist with crowns on 11 and 21
fn setup_worksheet(tmp: &TempDir, catalog: &Catalog) -> String {
    let order = create(
        tmp,
        "ana",
        &["order", "new", "--dentist", &catalog.dentist, "--patient", "P-0042"],
    );
    let ws = create(tmp, "ana", &["ws", "new", "--order", &order]);
    dlab(tmp)
        .args(["ws", "tooth", &ws, "11,21", "--product", "ZR-CR", "--shade", "A2"])
        .assert()
        .success();
    ws
}

fn lot_remaining(tmp: &TempDir, lot: &str) -> f64 {
    let value = json(tmp, &["lot", "show", lot]);
    number(&value["quantity_remaining"])
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    Command::cargo_bin("dlab")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dental laboratory"));
}

#[test]
fn test_version_displays() {
    Command::cargo_bin("dlab")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dlab"));
}

#[test]
fn test_init_creates_lab_structure() {
    let tmp = setup_lab();
    assert!(tmp.path().join(".dlab/config.yaml").exists());
    assert!(tmp.path().join(".dlab/lab.yaml").exists());
    assert!(tmp.path().join("worksheets").is_dir());
    assert!(tmp.path().join("inventory/lots").is_dir());
    assert!(tmp.path().join("documents/rendered").is_dir());
}

#[test]
fn test_init_twice_warns() {
    let tmp = setup_lab();
    dlab(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_outside_lab_fail() {
    let tmp = TempDir::new().unwrap();
    dlab(&tmp).args(["ws", "list"]).assert().failure();
}

// ============================================================================
// Records
// ============================================================================

#[test]
fn test_dentist_new_and_list() {
    let tmp = setup_lab();
    dlab(&tmp)
        .args(["dentist", "new", "--name", "Dr. Ivo Babić", "--license", "HLK-123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created dentist"));

    dlab(&tmp)
        .args(["dentist", "list", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dr. Ivo Babić"));
}

#[test]
fn test_inactive_dentist_cannot_order() {
    let tmp = setup_lab();
    let dentist = create(&tmp, "ana", &["dentist", "new", "--name", "Dr. Old"]);
    dlab(&tmp)
        .args(["dentist", "deactivate", &dentist])
        .assert()
        .success();
    dlab(&tmp)
        .args(["order", "new", "--dentist", &dentist])
        .assert()
        .failure()
        .stderr(predicate::str::contains("inactive"));
}

#[test]
fn test_short_ids_resolve_after_list() {
    let tmp = setup_lab();
    create(&tmp, "ana", &["dentist", "new", "--name", "Dr. A"]);
    dlab(&tmp).args(["dentist", "list"]).assert().success();
    dlab(&tmp)
        .args(["dentist", "show", "@1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dr. A"));
}

#[test]
fn test_short_ids_are_kept_per_record_kind() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    dlab(&tmp).args(["dentist", "list"]).assert().success();
    dlab(&tmp).args(["lot", "list"]).assert().success();

    // listing lots leaves the dentist numbering alone
    dlab(&tmp)
        .args(["dentist", "show", "@1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dr. Maja Horvat"));
    dlab(&tmp)
        .args(["lot", "show", "@1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ZR-001"));
    dlab(&tmp).args(["material", "show", "@1"]).assert().failure();

    let lot = json(&tmp, &["lot", "show", "@1"]);
    assert_eq!(lot["id"], catalog.lot.as_str());
}

#[test]
fn test_duplicate_lot_rejected() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    dlab(&tmp)
        .args([
            "lot", "receive", "--material", &catalog.material, "--lot", "ZR-001", "--quantity",
            "5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already received"));
}

#[test]
fn test_lot_import_from_csv() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let csv = tmp.path().join("lots.csv");
    fs::write(
        &csv,
        "material,lot_number,quantity,arrival,expiry\n\
         Zirconia disc,ZR-002,4,2026-02-01,2031-02-01\n\
         Zirconia disc,ZR-003,6,2026-03-01,\n",
    )
    .unwrap();

    dlab(&tmp)
        .arg("lot")
        .arg("import")
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Received 2 lot(s)"));

    let lots = json(&tmp, &["lot", "list", "--material", &catalog.material]);
    assert_eq!(lots.as_array().unwrap().len(), 3);
}

// ============================================================================
// Worksheets and the tooth chart
// ============================================================================

#[test]
fn test_invalid_tooth_rejected() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    dlab(&tmp).args(["ws", "tooth", &ws, "19"]).assert().failure();
    dlab(&tmp).args(["ws", "tooth", &ws, "56"]).assert().failure();
}

#[test]
fn test_bridge_marks_abutments_and_pontics() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    dlab(&tmp)
        .args(["ws", "bridge", &ws, "14", "16", "--no-materials"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 units"));

    let sheet = json(&tmp, &["ws", "show", &ws]);
    let teeth = sheet["teeth"].as_array().unwrap();
    let work_of = |tooth: u64| {
        teeth
            .iter()
            .find(|t| t["tooth"].as_u64() == Some(tooth))
            .map(|t| t["work"].as_str().unwrap().to_string())
    };
    assert_eq!(work_of(14).as_deref(), Some("abutment"));
    assert_eq!(work_of(15).as_deref(), Some("pontic"));
    assert_eq!(work_of(16).as_deref(), Some("abutment"));
}

#[test]
fn test_bridge_across_arches_rejected() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    dlab(&tmp)
        .args(["ws", "bridge", &ws, "16", "46"])
        .assert()
        .failure();
}

#[test]
fn test_chart_renders_svg() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    dlab(&tmp)
        .args(["chart", &ws])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<svg"))
        .stdout(predicate::str::contains("</svg>"));
}

#[test]
fn test_production_needs_teeth() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = create(&tmp, "ana", &["ws", "new", "--dentist", &catalog.dentist]);
    dlab(&tmp)
        .args(["ws", "transition", &ws, "in_production"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no tooth work"));
}

#[test]
fn test_invalid_transition_rejected() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    dlab(&tmp)
        .args(["ws", "transition", &ws, "delivered"])
        .assert()
        .failure();
}

#[test]
fn test_starting_production_consumes_fifo_and_cancel_restocks() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);

    dlab(&tmp)
        .args(["ws", "transition", &ws, "in_production"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from lot ZR-001"));
    assert_eq!(lot_remaining(&tmp, &catalog.lot), 8.0);

    dlab(&tmp)
        .args(["ws", "tooth", &ws, "12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("draft"));

    dlab(&tmp)
        .args(["ws", "consume", &ws, &catalog.material, "1"])
        .assert()
        .success();
    assert_eq!(lot_remaining(&tmp, &catalog.lot), 7.0);

    dlab(&tmp)
        .args(["ws", "transition", &ws, "cancelled", "-m", "patient moved"])
        .assert()
        .success();
    assert_eq!(lot_remaining(&tmp, &catalog.lot), 10.0);
}

#[test]
fn test_insufficient_stock_leaves_worksheet_in_draft() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    dlab(&tmp)
        .args(["ws", "material", &ws, &catalog.material, "20"])
        .assert()
        .success();

    dlab(&tmp)
        .args(["ws", "transition", &ws, "in_production"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("insufficient stock"));

    assert_eq!(lot_remaining(&tmp, &catalog.lot), 10.0);
    let sheet = json(&tmp, &["ws", "show", &ws]);
    assert_eq!(sheet["status"], "draft");
}

#[test]
fn test_quarantined_lot_is_skipped() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    dlab(&tmp)
        .args(["lot", "quarantine", &catalog.lot, "--reason", "cracked"])
        .assert()
        .success();
    dlab(&tmp)
        .args(["ws", "transition", &ws, "in_production"])
        .assert()
        .failure();

    dlab(&tmp)
        .args(["lot", "quarantine", &catalog.lot, "--release"])
        .assert()
        .success();
    dlab(&tmp)
        .args(["ws", "transition", &ws, "in_production"])
        .assert()
        .success();
}

// ============================================================================
// QC, documents, invoicing
// ============================================================================

/// Take a worksheet from draft to qc_pending as technician "ana"
fn to_qc_pending(tmp: &TempDir, ws: &str) {
    for status in ["in_production", "qc_pending"] {
        dlab(tmp)
            .args(["ws", "transition", ws, status])
            .assert()
            .success();
    }
}

#[test]
fn test_qc_requires_independent_inspector() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    to_qc_pending(&tmp, &ws);

    dlab_as(&tmp, "ana")
        .args(["qc", "approve", &ws])
        .assert()
        .failure()
        .stderr(predicate::str::contains("someone else"));

    dlab_as(&tmp, "ivo")
        .args(["qc", "approve", &ws])
        .assert()
        .success()
        .stdout(predicate::str::contains("approved by ivo"));
}

#[test]
fn test_qc_reject_returns_to_rework() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    to_qc_pending(&tmp, &ws);

    dlab_as(&tmp, "ivo")
        .args(["qc", "reject", &ws])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reason"));

    dlab_as(&tmp, "ivo")
        .args(["qc", "reject", &ws, "--fail", "margins"])
        .assert()
        .success();
    let sheet = json(&tmp, &["ws", "show", &ws]);
    assert_eq!(sheet["status"], "qc_rejected");

    dlab(&tmp)
        .args(["ws", "transition", &ws, "in_production"])
        .assert()
        .success();
    // rework books nothing new
    assert_eq!(lot_remaining(&tmp, &catalog.lot), 8.0);
}

#[test]
fn test_full_flow_to_paid_invoice() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    to_qc_pending(&tmp, &ws);
    dlab_as(&tmp, "ivo")
        .args(["qc", "approve", &ws])
        .assert()
        .success();

    dlab(&tmp)
        .args(["ws", "transition", &ws, "delivered"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Annex XIII"));

    let doc = create(&tmp, "ana", &["doc", "annex", &ws]);
    assert!(doc.starts_with("DOC-"));
    let record = json(&tmp, &["doc", "show", &doc]);
    let file = tmp.path().join(record["file"].as_str().unwrap());
    let annex = fs::read_to_string(&file).unwrap();
    assert!(annex.contains("Dr. Maja Horvat"));
    assert!(annex.contains("P-0042"));
    assert!(annex.contains("ZR-001"));
    dlab(&tmp).args(["doc", "verify"]).assert().success();

    dlab(&tmp)
        .args(["ws", "transition", &ws, "delivered"])
        .assert()
        .success();

    let invoice = create(
        &tmp,
        "ana",
        &["invoice", "draft", "--dentist", &catalog.dentist, "--all-delivered"],
    );
    let number = create(&tmp, "ana", &["invoice", "issue", &invoice]);
    assert!(number.starts_with('R'));
    assert!(number.ends_with("-0001"));

    // 2 crowns x 120 + 25% VAT
    let issued = json(&tmp, &["invoice", "show", &number]);
    assert_eq!(issued["status"], "issued");
    assert_eq!(issued["lines"].as_array().unwrap().len(), 1);

    dlab(&tmp)
        .args(["report", "receivables"])
        .assert()
        .success()
        .stdout(predicate::str::contains(number.as_str()))
        .stdout(predicate::str::contains("300.00 EUR"));

    dlab(&tmp)
        .args(["export", "invoices"])
        .assert()
        .success()
        .stdout(predicate::str::contains(number.as_str()))
        .stdout(predicate::str::contains("300.00"));

    dlab(&tmp)
        .args(["invoice", "pay", &number, "--date", "2026-07-01"])
        .assert()
        .success();
    let paid = json(&tmp, &["invoice", "show", &number]);
    assert_eq!(paid["status"], "paid");
}

#[test]
fn test_invoice_numbers_stay_gap_free_after_cancel() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    to_qc_pending(&tmp, &ws);
    dlab_as(&tmp, "ivo").args(["qc", "approve", &ws]).assert().success();
    dlab(&tmp).args(["doc", "annex", &ws]).assert().success();
    dlab(&tmp)
        .args(["ws", "transition", &ws, "delivered"])
        .assert()
        .success();

    let first = create(&tmp, "ana", &["invoice", "draft", "--dentist", &catalog.dentist, &ws]);
    let n1 = create(&tmp, "ana", &["invoice", "issue", &first]);

    dlab(&tmp)
        .args(["invoice", "draft", "--dentist", &catalog.dentist, &ws])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already on invoice"));

    dlab(&tmp)
        .args(["invoice", "cancel", &n1, "--yes"])
        .assert()
        .success();

    let second = create(&tmp, "ana", &["invoice", "draft", "--dentist", &catalog.dentist, &ws]);
    let n2 = create(&tmp, "ana", &["invoice", "issue", &second]);
    assert!(n1.ends_with("-0001"));
    assert!(n2.ends_with("-0002"));
}

#[test]
fn test_undelivered_work_cannot_be_invoiced() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    dlab(&tmp)
        .args(["invoice", "draft", "--dentist", &catalog.dentist, &ws])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only delivered"));
}

// ============================================================================
// Roles
// ============================================================================

#[test]
fn test_roster_gates_transitions() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);

    dlab(&tmp)
        .args([
            "team", "add", "--name", "Ana", "--email", "ana@lab.test", "--username", "ana",
            "--roles", "technician",
        ])
        .assert()
        .success();
    dlab(&tmp)
        .args([
            "team", "add", "--name", "Ivo", "--email", "ivo@lab.test", "--username", "ivo",
            "--roles", "inspector",
        ])
        .assert()
        .success();

    dlab_as(&tmp, "ivo")
        .args(["ws", "transition", &ws, "in_production"])
        .assert()
        .failure();
    dlab_as(&tmp, "mallory")
        .args(["ws", "transition", &ws, "in_production"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found in team roster"));

    to_qc_pending(&tmp, &ws);
    dlab_as(&tmp, "ivo")
        .args(["qc", "approve", &ws])
        .assert()
        .success();

    dlab_as(&tmp, "ana")
        .args(["ws", "transition", &ws, "cancelled"])
        .assert()
        .failure();
}

#[test]
fn test_reports_render_markdown() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    setup_worksheet(&tmp, &catalog);

    dlab(&tmp)
        .args(["report", "stock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Stock Report"))
        .stdout(predicate::str::contains("Zirconia disc"));

    let out = tmp.path().join("production.md");
    dlab(&tmp)
        .args(["report", "production", "-o"])
        .arg(&out)
        .assert()
        .success();
    let report = fs::read_to_string(&out).unwrap();
    assert!(report.contains("| draft"));
}

#[test]
fn test_delivery_needs_the_rendered_annex_file() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    to_qc_pending(&tmp, &ws);
    dlab_as(&tmp, "ivo")
        .args(["qc", "approve", &ws])
        .assert()
        .success();

    let doc = create(&tmp, "ana", &["doc", "annex", &ws]);
    let record = json(&tmp, &["doc", "show", &doc]);
    let file = tmp.path().join(record["file"].as_str().unwrap());
    fs::remove_file(&file).unwrap();

    dlab(&tmp)
        .args(["ws", "transition", &ws, "delivered"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing"));
    let sheet = json(&tmp, &["ws", "show", &ws]);
    assert_eq!(sheet["status"], "qc_approved");

    // a regenerated statement unblocks delivery
    create(&tmp, "ana", &["doc", "annex", &ws]);
    dlab(&tmp)
        .args(["ws", "transition", &ws, "delivered"])
        .assert()
        .success();
}

#[test]
fn test_qc_independence_ignores_username_case() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    dlab(&tmp)
        .args([
            "team", "add", "--name", "Ana", "--username", "ana", "--roles",
            "technician,inspector",
        ])
        .assert()
        .success();
    to_qc_pending(&tmp, &ws);

    dlab_as(&tmp, "ANA")
        .args(["qc", "approve", &ws])
        .assert()
        .failure()
        .stderr(predicate::str::contains("someone else"));
    let sheet = json(&tmp, &["ws", "show", &ws]);
    assert_eq!(sheet["status"], "qc_pending");
    assert_eq!(sheet["technician"], "ana");
}

#[test]
fn test_invalid_roster_blocks_gated_commands() {
    let tmp = setup_lab();
    let catalog = setup_catalog(&tmp);
    let ws = setup_worksheet(&tmp, &catalog);
    fs::write(
        tmp.path().join(".dlab/team.yaml"),
        "members:\n  - name: Ana\n    username: ana\n    roles: [technican]\n",
    )
    .unwrap();

    dlab(&tmp)
        .args(["ws", "transition", &ws, "in_production"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid team roster"));
    dlab(&tmp)
        .args(["team", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid team roster"));
    assert_eq!(lot_remaining(&tmp, &catalog.lot), 10.0);

    fs::write(
        tmp.path().join(".dlab/team.yaml"),
        "transition_roles:\n  qc_aproved: [manager]\n",
    )
    .unwrap();
    dlab(&tmp)
        .args(["ws", "transition", &ws, "in_production"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid team roster"));
}

#[test]
fn test_huge_expiry_windows_are_rejected() {
    let tmp = setup_lab();
    setup_catalog(&tmp);

    dlab(&tmp)
        .args(["report", "stock", "--days=100000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expiry window"));
    dlab(&tmp)
        .args(["lot", "list", "--expiring=9223372036854775807"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expiry window"));
    dlab(&tmp)
        .args(["lot", "list", "--expiring=30"])
        .assert()
        .success();
}
