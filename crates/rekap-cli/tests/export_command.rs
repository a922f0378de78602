//! End-to-end tests for the `rekap` binary
//!
//! ## Exit Code Contract
//!
//! | Exit Code | Meaning |
//! |-----------|---------|
//! | 0 | Recap written, or no data for the period |
//! | 1 | Any fetch, validation, configuration or serialization error |

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use calamine::{Data, Reader, Xlsx};
use pretty_assertions::assert_eq;

fn rekap() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rekap"));
    cmd.env_remove("RUST_LOG")
        .env_remove("REKAP_SOURCE")
        .env_remove("REKAP_CONFIG");
    cmd
}

const DUMP: &str = r#"{
  "students": [
    { "student_id": "0051", "full_name": "Ayu Lestari", "class_id": "7A", "active": true },
    { "student_id": "0052", "full_name": "Budi Santoso", "class_id": "7A", "active": true },
    { "student_id": "0099", "full_name": "Wulan", "class_id": "8B", "active": true }
  ],
  "attendance": [
    { "student_id": "0051", "class_id": "7A", "date": "2025-03-01", "status": "Present", "academic_year": "2024/2025" },
    { "student_id": "0051", "class_id": "7A", "date": "2025-03-02", "status": "Sick", "academic_year": "2024/2025" },
    { "student_id": "0052", "class_id": "7A", "date": "2025-03-01", "status": "Absent", "academic_year": "2024/2025" },
    { "student_id": "0051", "class_id": "7A", "date": "2024-09-02", "status": "H", "academic_year": "2024/2025" },
    { "student_id": "0052", "class_id": "7A", "date": "2024-09-02", "status": "I", "academic_year": "2024/2025" },
    { "student_id": "0099", "class_id": "8B", "date": "2025-03-01", "status": "Izin", "academic_year": "2024/2025" },
    { "student_id": "0099", "class_id": "8B", "date": "2025-04-01", "status": "Late", "academic_year": "2024/2025" }
  ]
}"#;

const CONFIG: &str = r#"
[school]
name = "SMP Negeri 1 Contoh"

[teachers]
"7A" = "Dewi Anggraini"
"8B" = "Joko Susilo"

[store]
page_size = 2
"#;

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dump.json"), DUMP).unwrap();
        std::fs::write(dir.path().join("rekap.toml"), CONFIG).unwrap();
        std::fs::create_dir(dir.path().join("out")).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Output {
        rekap()
            .args(args)
            .arg("--source")
            .arg(self.path("dump.json"))
            .arg("--config")
            .arg(self.path("rekap.toml"))
            .output()
            .expect("failed to execute rekap")
    }

    fn out_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.path("out"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn first_sheet(path: &Path) -> calamine::Range<Data> {
    let bytes = std::fs::read(path).unwrap();
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
    let name = workbook.sheet_names()[0].clone();
    workbook.worksheet_range(&name).unwrap()
}

// =============================================================================
// monthly / semester
// =============================================================================

#[test]
fn monthly_writes_workbook() {
    let fx = Fixture::new();
    let out_dir = fx.path("out");
    let output = fx.run(&["monthly", "--class", "7A", "--month", "2025-03", "--output", out_dir.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("(2 students)"));
    assert_eq!(fx.out_files(), ["Recap_Attendance_Class_7A_Maret_2025.xlsx"]);

    let range = first_sheet(&fx.path("out/Recap_Attendance_Class_7A_Maret_2025.xlsx"));
    assert_eq!(range.get_value((0, 0)), Some(&Data::String("SMP Negeri 1 Contoh".into())));
    assert_eq!(range.get_value((4, 2)), Some(&Data::String("01-03".into())));
    assert_eq!(range.get_value((5, 1)), Some(&Data::String("Ayu Lestari".into())));
    assert_eq!(range.get_value((5, 9)), Some(&Data::Float(50.0)));
    assert_eq!(range.get_value((6, 9)), Some(&Data::Float(0.0)));
}

#[test]
fn semester_writes_workbook() {
    let fx = Fixture::new();
    let out_dir = fx.path("out");
    let output = fx.run(&[
        "semester",
        "--class",
        "7A",
        "--academic-year",
        "2024/2025",
        "--semester",
        "1",
        "--output",
        out_dir.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(fx.out_files(), ["Recap_Attendance_Semester_1_Class_7A_2024-2025.xlsx"]);

    let range = first_sheet(&fx.path("out/Recap_Attendance_Semester_1_Class_7A_2024-2025.xlsx"));
    // only the September records fall in the odd semester
    assert_eq!(range.get_value((5, 3)), Some(&Data::Float(1.0)));
    assert_eq!(range.get_value((5, 9)), Some(&Data::String("Very Good".into())));
    assert_eq!(range.get_value((6, 5)), Some(&Data::Float(1.0)));
    assert_eq!(range.get_value((6, 9)), Some(&Data::String("Poor".into())));
}

#[test]
fn empty_month_reports_no_data() {
    let fx = Fixture::new();
    let out_dir = fx.path("out");
    let output = fx.run(&["monthly", "-c", "7A", "-m", "2025-06", "-o", out_dir.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("No attendance data for class 7A in Juni 2025"));
    assert!(fx.out_files().is_empty());
}

// =============================================================================
// Failures exit 1 with one readable line
// =============================================================================

#[test]
fn unknown_status_fails() {
    let fx = Fixture::new();
    let out_dir = fx.path("out");
    let output = fx.run(&["monthly", "-c", "8B", "-m", "2025-04", "-o", out_dir.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: Unknown attendance status 'Late' for student 0099 on 2025-04-01"));
    assert!(fx.out_files().is_empty());
}

#[test]
fn missing_teacher_fails() {
    let fx = Fixture::new();
    std::fs::write(fx.path("rekap.toml"), "[school]\nname = \"X\"\n").unwrap();
    let out_dir = fx.path("out");
    let output = fx.run(&["monthly", "-c", "7A", "-m", "2025-03", "-o", out_dir.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("No class teacher configured for class 7A"));
}

#[test]
fn invalid_month_fails() {
    let fx = Fixture::new();
    let output = fx.run(&["monthly", "-c", "7A", "-m", "2025-13"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Invalid month '2025-13'"));
}

#[test]
fn bad_config_fails() {
    let fx = Fixture::new();
    std::fs::write(fx.path("rekap.toml"), "[store]\npage_size = 0\n").unwrap();
    let output = fx.run(&["monthly", "-c", "7A", "-m", "2025-03"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("store.page_size must be at least 1"));
}

// =============================================================================
// summary
// =============================================================================

#[test]
fn summary_json() {
    let fx = Fixture::new();
    let output = fx.run(&["summary", "-c", "7A", "--month", "2025-03", "--format", "json"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["class_id"], "7A");
    assert_eq!(json["dates"], 2);
    assert_eq!(json["students"][0]["student_name"], "Ayu Lestari");
    assert_eq!(json["students"][0]["percentage"], 50);
    assert_eq!(json["students"][1]["absent"], 1);
}

#[test]
fn summary_text() {
    let fx = Fixture::new();
    let output = fx.run(&["summary", "-c", "7A", "-a", "2024/2025", "--semester", "1"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("REKAP ABSENSI KELAS 7A"));
    assert!(text.contains("Semester Ganjil (Juli - Desember) 2024"));
    assert!(text.contains("Ayu Lestari"));
    assert!(!text.contains("Mengetahui"));
}

#[test]
fn missing_database_source_fails() {
    let fx = Fixture::new();
    let missing = fx.path("rekap.sqlite");
    let output = rekap()
        .args(["monthly", "-c", "7A", "-m", "2025-03", "--teacher", "Dewi"])
        .arg("--source")
        .arg(&missing)
        .output()
        .expect("failed to execute rekap");

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("cannot open source"));
    assert!(!missing.exists());
}
