// ==========================================
// 捕获导入集成测试
// ==========================================
// 测试目标: 别名解析、释放位置成对规则、已有捕获复用（新建 vs 更新）
// ==========================================

mod test_helpers;

use std::sync::Arc;
use survey_csv_import::importer::{
    import_spreadsheet, CaptureImportStrategy, ImportError, ImportStrategy, UniversalFileParser,
};
use test_helpers::*;

async fn strategy(reference: FakeReferenceData, sink: Arc<FakeSink>) -> (Arc<FakeReferenceData>, CaptureImportStrategy) {
    let reference = Arc::new(reference);
    let strategy = CaptureImportStrategy::new(SURVEY_ID, reference.clone(), sink, default_settings().await)
        .expect("capture column spec should be valid");
    (reference, strategy)
}

#[tokio::test]
async fn test_new_and_existing_captures_split() {
    let moose = survey_critter("Moose-1", MOOSE_TSN);
    let caribou = survey_critter("Caribou-1", CARIBOU_TSN);
    let existing = capture_summary(&moose, date(2024, 3, 1), Some(time(9, 15)));

    let reference = FakeReferenceData {
        survey_critters: vec![moose.clone(), caribou.clone()],
        captures: vec![existing.clone()],
        ..Default::default()
    };
    let sink = Arc::new(FakeSink::default());
    let (reference, strategy) = strategy(reference, sink.clone()).await;

    let csv = "\
NICKNAME,CAPTURE_DATE,CAPTURE_TIME,LATITUDE,LONGITUDE,RELEASE_LATITUDE,RELEASE_LONGITUDE
moose-1,2024-03-01,09:15,58.1,-129.9,58.2,-129.8
Caribou-1,2024-03-02,,59.5,-133.7,,
Moose-1,2024-04-10,14:00,58.0,-130.0,,
";
    let outcome = import_spreadsheet(&strategy, &csv_file("captures.csv", csv))
        .await
        .expect("import should not raise");

    let summary = outcome.summary().expect("import should succeed");
    assert_eq!(summary.created, 2);
    assert_eq!(summary.updated, 1);

    let updated = sink.updated_payloads();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].captures[0].capture_id, existing.capture_id);
    assert!(updated[0].captures[0].release_location.is_some());

    let created = sink.created_payloads();
    assert_eq!(created[0].captures.len(), 2);
    assert!(created[0].captures.iter().all(|c| c.capture_id != existing.capture_id));

    // 已有捕获按去重后的个体一次性查询
    let calls = reference.calls_to("get_captures_for_critters");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].keys.len(), 2);
}

#[tokio::test]
async fn test_capture_row_rules() {
    let reference = FakeReferenceData {
        survey_critters: vec![survey_critter("Moose-1", MOOSE_TSN)],
        ..Default::default()
    };
    let (_, strategy) = strategy(reference, Arc::new(FakeSink::default())).await;

    let csv = "\
ALIAS,CAPTURE_DATE,CAPTURE_TIME,CAPTURE_LATITUDE,CAPTURE_LONGITUDE,RELEASE_DATE,RELEASE_LATITUDE,RELEASE_LONGITUDE
Ghost,2024-03-01,,58.1,-129.9,,,
Moose-1,2024-03-01,,58.1,-129.9,,58.2,
Moose-1,2024-03-05,,58.1,-129.9,2024-03-01,,
Moose-1,2024-03-06,noon,95.0,-129.9,,,
Moose-1,2024-03-07,07:30,58.1,-129.9,2024-03-08,58.3,-129.7
";
    let worksheet = UniversalFileParser.parse("captures.csv", csv.as_bytes()).unwrap();
    let result = strategy.validate_rows(&worksheet).await.unwrap();
    let issues = result.issues();

    let rows: Vec<usize> = issues.iter().map(|i| i.row).collect();
    assert_eq!(rows, vec![0, 1, 2, 3, 3]);
    assert!(issues[0].message.contains("Ghost"));
    assert!(issues[1].message.contains("RELEASE_LATITUDE and RELEASE_LONGITUDE"));
    assert!(issues[2].message.contains("before CAPTURE_DATE"));
    assert!(issues[3].message.contains("noon"));
    assert!(issues[4].message.contains("latitude"));
}

#[tokio::test]
async fn test_partial_update_is_fatal() {
    let moose = survey_critter("Moose-1", MOOSE_TSN);
    let existing = capture_summary(&moose, date(2024, 3, 1), None);
    let reference = FakeReferenceData {
        survey_critters: vec![moose],
        captures: vec![existing],
        ..Default::default()
    };
    let (_, strategy) = strategy(reference, Arc::new(FakeSink::short_by(1))).await;

    let csv = "ALIAS,CAPTURE_DATE,CAPTURE_LATITUDE,CAPTURE_LONGITUDE\nMoose-1,2024-03-01,58.1,-129.9\n";
    let result = import_spreadsheet(&strategy, &csv_file("captures.csv", csv)).await;

    assert!(matches!(
        result,
        Err(ImportError::PartialInsert { ref kind, expected: 1, created: 0 }) if kind == "captures"
    ));
}

#[tokio::test]
async fn test_duplicate_capture_rows_rejected() {
    let moose = survey_critter("Moose-1", MOOSE_TSN);
    let existing = capture_summary(&moose, date(2024, 3, 1), Some(time(9, 15)));
    let reference = FakeReferenceData {
        survey_critters: vec![moose],
        captures: vec![existing],
        ..Default::default()
    };
    let (_, strategy) = strategy(reference, Arc::new(FakeSink::default())).await;

    let csv = "\
ALIAS,CAPTURE_DATE,CAPTURE_TIME,CAPTURE_LATITUDE,CAPTURE_LONGITUDE
Moose-1,2024-03-01,09:15,58.1,-129.9
moose-1,2024-03-01,09:15,58.2,-129.8
Moose-1,2024-04-10,,58.0,-130.0
Moose-1,2024-04-10,,58.0,-130.1
Moose-1,2024-04-10,08:00,58.0,-130.0
";
    let worksheet = UniversalFileParser.parse("captures.csv", csv.as_bytes()).unwrap();
    let result = strategy.validate_rows(&worksheet).await.unwrap();
    let issues = result.issues();

    // 首行保留，后续重复行各报一次
    let rows: Vec<usize> = issues.iter().map(|i| i.row).collect();
    assert_eq!(rows, vec![1, 3]);
    assert!(issues[0].message.contains("conflicts with another CSV row (0)"));
    assert!(issues[1].message.contains("conflicts with another CSV row (2)"));
}

#[tokio::test]
async fn test_numeric_alias_resolves() {
    let critter = survey_critter("101", MOOSE_TSN);
    let reference = FakeReferenceData {
        survey_critters: vec![critter.clone()],
        ..Default::default()
    };
    let sink = Arc::new(FakeSink::default());
    let (_, strategy) = strategy(reference, sink.clone()).await;

    let csv = "ALIAS,CAPTURE_DATE,CAPTURE_LATITUDE,CAPTURE_LONGITUDE\n101,2024-03-01,58.1,-129.9\n";
    let outcome = import_spreadsheet(&strategy, &csv_file("captures.csv", csv)).await.unwrap();

    assert_eq!(outcome.summary().map(|s| s.created), Some(1));
    assert_eq!(sink.created_payloads()[0].captures[0].critter_id, critter.critter_id);
}
