//! 端到端流程测试：内存存储 + 脚本化 OCR

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use enrollment_pipeline::config::{Config, ValidationConfig};
use enrollment_pipeline::infrastructure::{
    hasher, DocumentRecord, LinkStatus, OfferingLookup, Submission, TermId,
};
use enrollment_pipeline::models::{DocumentFingerprint, DocumentStatus, FailureKind, SubjectKey};
use enrollment_pipeline::orchestrator::RunOptions;
use enrollment_pipeline::{
    App, AppError, AppResult, BatchScheduler, DocumentCtx, DocumentFlow, EnrollmentStore,
    FlowOptions, InMemoryStore, OcrOrchestrator, OcrProvider, ProcessMode, RawDocument,
};

const TERM: &str = "2025-1";

/// 把文档字节原样当作识别结果
struct EchoOcr;

#[async_trait]
impl OcrProvider for EchoOcr {
    fn name(&self) -> &str {
        "echo"
    }

    async fn try_extract(&self, bytes: &[u8], _mime_type: &str) -> AppResult<String> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

struct BrokenOcr;

#[async_trait]
impl OcrProvider for BrokenOcr {
    fn name(&self) -> &str {
        "broken"
    }

    async fn try_extract(&self, _bytes: &[u8], _mime_type: &str) -> AppResult<String> {
        Err(AppError::provider_unavailable("broken", "HTTP 503"))
    }
}

struct PanickingOcr;

#[async_trait]
impl OcrProvider for PanickingOcr {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn try_extract(&self, _bytes: &[u8], _mime_type: &str) -> AppResult<String> {
        panic!("ocr worker crashed");
    }
}

/// 记录同时在识别中的文档数峰值
#[derive(Default)]
struct InFlightOcr {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl OcrProvider for InFlightOcr {
    fn name(&self) -> &str {
        "in-flight"
    }

    async fn try_extract(&self, bytes: &[u8], _mime_type: &str) -> AppResult<String> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// 已持久化的关联立即计入已接受科目；写入前稍作延迟，
/// 让并发的校验都先于任何一次写入完成
struct LinkCountingStore {
    inner: InMemoryStore,
    persisted: Mutex<Vec<(String, SubjectKey)>>,
}

impl LinkCountingStore {
    fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            persisted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EnrollmentStore for LinkCountingStore {
    async fn find_document_by_fingerprint(
        &self,
        fingerprint: &DocumentFingerprint,
    ) -> AppResult<Option<DocumentRecord>> {
        self.inner.find_document_by_fingerprint(fingerprint).await
    }

    async fn identity_registration(&self, identity: &str) -> AppResult<Option<String>> {
        self.inner.identity_registration(identity).await
    }

    async fn find_pending_document(
        &self,
        identity: &str,
        statuses: &[DocumentStatus],
    ) -> AppResult<Option<DocumentRecord>> {
        self.inner.find_pending_document(identity, statuses).await
    }

    async fn accepted_subjects(&self, identity: &str) -> AppResult<Vec<SubjectKey>> {
        let mut keys = self.inner.accepted_subjects(identity).await?;
        keys.extend(
            self.persisted
                .lock()
                .unwrap()
                .iter()
                .filter(|(owner, _)| owner == identity)
                .map(|(_, key)| key.clone()),
        );
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn resolve_offering(&self, term: &str, sigla: &str, grupo: &str) -> AppResult<OfferingLookup> {
        self.inner.resolve_offering(term, sigla, grupo).await
    }

    async fn active_term(&self) -> AppResult<Option<TermId>> {
        self.inner.active_term().await
    }

    async fn persist(&self, submission: &Submission) -> AppResult<()> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.persist(submission).await?;
        let mut persisted = self.persisted.lock().unwrap();
        for mapped in submission.mapped_subjects.iter().filter(|m| m.can_add) {
            persisted.push((submission.identity.clone(), mapped.subject.key()));
        }
        Ok(())
    }
}

fn receipt(registration: &str, name: &str, rows: &[(&str, &str, &str)]) -> String {
    let mut text = format!("{}\n{}\n", registration, name);
    for (sigla, grupo, materia) in rows {
        text.push_str(&format!("| {} | {} | {} |\n", sigla, grupo, materia));
    }
    text
}

fn document(text: &str, file_name: &str) -> RawDocument {
    RawDocument::new(text.as_bytes().to_vec(), "image/png", file_name)
}

fn catalog() -> InMemoryStore {
    InMemoryStore::new()
        .with_active_term(TERM)
        .with_subject("INF412", "PROGRAMACION III")
        .with_subject("INF413", "SISTEMAS OPERATIVOS")
        .with_subject("MAT101", "CALCULO I")
        .with_section("SA")
        .with_section("SB")
        .with_offering(1, TERM, "INF412", "SA", Some("120363001@g.us"))
        .with_offering(2, TERM, "INF413", "SA", Some("120363002@g.us"))
        .with_offering(3, TERM, "MAT101", "SA", None)
}

fn flow(store: Arc<dyn EnrollmentStore>, providers: Vec<Box<dyn OcrProvider>>, persist: bool) -> DocumentFlow {
    DocumentFlow::new(
        Arc::new(OcrOrchestrator::new(providers)),
        store,
        ValidationConfig::default(),
        FlowOptions {
            persist,
            detailed_metrics: true,
        },
    )
}

fn echo_flow(store: Arc<dyn EnrollmentStore>, persist: bool) -> DocumentFlow {
    flow(store, vec![Box::new(EchoOcr)], persist)
}

fn options(mode: ProcessMode, batch_size: usize) -> RunOptions {
    RunOptions {
        mode,
        batch_size,
        detailed_metrics: true,
    }
}

#[tokio::test]
async fn accepted_receipt_is_persisted_with_pending_links() {
    let store = Arc::new(catalog());
    let flow = echo_flow(store.clone(), true);
    let text = "223456789\nJuan Perez Lopez\n| INF412 | SA | PROGRAMACION III |";
    let doc = document(text, "juan.png");

    let result = flow.run(&doc, &DocumentCtx::new(0, "juan.png")).await;

    assert!(result.success, "unexpected failure: {:?}", result.error);
    let summary = result.extracted_data.expect("summary");
    assert_eq!(summary.registration_number, "223456789");
    assert_eq!(summary.student_name, "Juan Perez Lopez");
    assert_eq!(summary.valid_subjects, 1);
    assert!(result.timings.is_some());

    let student = store.student("test_223456789@c.us").await.expect("student");
    assert_eq!(student.registered_subjects, 1);
    assert_eq!(student.name, "Juan Perez Lopez");

    let links = store.links_for(&hasher::fingerprint(doc.bytes())).await;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].offering_id, 1);
    assert_eq!(links[0].status, LinkStatus::Pending);
}

#[tokio::test]
async fn parallel_run_reports_every_document() {
    let store = Arc::new(catalog());
    let scheduler = BatchScheduler::new(Arc::new(echo_flow(store.clone(), false)));
    let documents: Vec<RawDocument> = (0..5)
        .map(|i| {
            let text = receipt(
                &format!("22345678{}", i),
                "Juan Perez Lopez",
                &[("INF412", "SA", "PROGRAMACION III")],
            );
            document(&text, &format!("doc_{}.png", i))
        })
        .collect();

    let report = scheduler.run(documents, options(ProcessMode::Parallel, 10)).await;

    assert_eq!(report.total_files, 5);
    assert_eq!(report.processed_files, 5);
    assert_eq!(report.successful_files, 5);
    assert_eq!(report.mode, ProcessMode::Parallel);
    let expected = (5.0 / report.total_duration.max(1) as f64 * 1000.0 * 100.0).round() / 100.0;
    assert_eq!(report.throughput, expected);
    let order: Vec<usize> = report.results.iter().map(|r| r.index).collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4]);

    // 未开启持久化时存储保持不变
    assert_eq!(store.document_count().await, 0);
}

#[tokio::test]
async fn resubmitted_document_is_rejected_as_duplicate() {
    let text = receipt("223456789", "Juan Perez Lopez", &[("INF412", "SA", "PROGRAMACION III")]);
    let doc = document(&text, "juan.png");
    let fingerprint = hasher::fingerprint(doc.bytes());
    let uploaded_at = chrono::Utc::now();
    let store = Arc::new(catalog().with_document(
        fingerprint.as_str(),
        None,
        DocumentStatus::Completed,
        uploaded_at,
    ));

    let result = echo_flow(store, false)
        .run(&doc, &DocumentCtx::new(0, "juan.png"))
        .await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(FailureKind::DuplicateDocument));
    let summary = result.extracted_data.expect("summary");
    assert!(summary.is_duplicate_document);
    assert_eq!(summary.new_subjects, 0);
    assert_eq!(summary.valid_subjects, 0);
    assert!(result.validation_errors[0].starts_with("Documento duplicado detectado"));
}

#[tokio::test]
async fn sequential_resubmission_after_persist_is_duplicate() {
    let store = Arc::new(catalog());
    let scheduler = BatchScheduler::new(Arc::new(echo_flow(store.clone(), true)));
    let text = receipt("223456789", "Juan Perez Lopez", &[("INF412", "SA", "PROGRAMACION III")]);

    let report = scheduler
        .run(
            vec![document(&text, "first.png"), document(&text, "again.png")],
            options(ProcessMode::Sequential, 10),
        )
        .await;

    assert_eq!(report.successful_files, 1);
    assert!(report.results[0].success);
    assert_eq!(report.results[1].error_kind, Some(FailureKind::DuplicateDocument));
    assert_eq!(store.document_count().await, 1);
}

#[tokio::test]
async fn quota_overflow_reports_remaining_slots() {
    let accepted: Vec<SubjectKey> = (0..7)
        .map(|i| SubjectKey::new(format!("ECO10{}", i), "SB"))
        .collect();
    let store = Arc::new(catalog().with_student(
        "test_223456789@c.us",
        "223456789",
        "Juan Perez Lopez",
        accepted,
    ));
    let text = receipt(
        "223456789",
        "Juan Perez Lopez",
        &[("INF412", "SA", "PROGRAMACION III"), ("INF413", "SA", "SISTEMAS OPERATIVOS")],
    );

    let result = echo_flow(store, false)
        .run(&document(&text, "juan.png"), &DocumentCtx::new(0, "juan.png"))
        .await;

    assert_eq!(result.error_kind, Some(FailureKind::QuotaExceeded));
    let summary = result.extracted_data.expect("summary");
    assert!(summary.would_exceed_limit);
    assert_eq!(summary.current_enrollment_count, 7);
    assert_eq!(summary.remaining_slots, Some(1));
}

#[tokio::test]
async fn explicit_identity_with_other_registration_is_rejected() {
    let store = Arc::new(catalog().with_student("59170000000@c.us", "222009969", "Vargas Cruz Camila", vec![]));
    let text = receipt("223456789", "Juan Perez Lopez", &[("INF412", "SA", "PROGRAMACION III")]);
    let ctx = DocumentCtx::new(0, "juan.png").with_identity("59170000000@c.us");

    let result = echo_flow(store, false).run(&document(&text, "juan.png"), &ctx).await;

    assert_eq!(result.error_kind, Some(FailureKind::RegistrationMismatch));
    assert!(result.extracted_data.expect("summary").registration_mismatch);
    assert_eq!(
        result.error.as_deref(),
        Some("Número de registro no coincide: esperado 222009969, recibido 223456789")
    );
}

#[tokio::test]
async fn unmapped_subject_does_not_fail_the_document() {
    let store = Arc::new(catalog());
    let text = receipt(
        "223456789",
        "Juan Perez Lopez",
        &[("INF412", "SA", "PROGRAMACION III"), ("MAT101", "SA", "CALCULO I")],
    );
    let doc = document(&text, "juan.png");

    let result = echo_flow(store.clone(), true)
        .run(&doc, &DocumentCtx::new(0, "juan.png"))
        .await;

    assert!(result.success);
    let summary = result.extracted_data.expect("summary");
    assert_eq!(summary.valid_subjects, 1);
    assert_eq!(summary.unmapped_subjects, 1);
    assert_eq!(
        result.validation_errors,
        vec!["1 materia(s) no tienen grupo de WhatsApp configurado".to_string()]
    );
    assert_eq!(store.links_for(&hasher::fingerprint(doc.bytes())).await.len(), 1);
}

#[tokio::test]
async fn falls_back_to_the_next_provider() {
    let store = Arc::new(catalog());
    let flow = flow(store, vec![Box::new(BrokenOcr), Box::new(EchoOcr)], false);
    let text = receipt("223456789", "Juan Perez Lopez", &[("INF412", "SA", "PROGRAMACION III")]);

    let result = flow.run(&document(&text, "juan.png"), &DocumentCtx::new(0, "juan.png")).await;

    assert!(result.success);
}

#[tokio::test]
async fn exhausted_providers_fail_only_that_document() {
    let store = Arc::new(catalog());
    let scheduler = BatchScheduler::new(Arc::new(flow(store, vec![Box::new(BrokenOcr)], false)));

    let report = scheduler
        .run(
            vec![document("a", "a.png"), document("b", "b.png")],
            options(ProcessMode::Batch, 1),
        )
        .await;

    assert_eq!(report.processed_files, 2);
    assert_eq!(report.failed_files, 2);
    for result in &report.results {
        assert_eq!(result.error_kind, Some(FailureKind::AllProvidersFailed));
        assert!(result.error.as_deref().unwrap_or_default().contains("HTTP 503"));
    }
}

#[tokio::test]
async fn unreadable_transcript_is_parse_invalid() {
    let store = Arc::new(catalog());
    let result = echo_flow(store, false)
        .run(&document("~~ ### ~~", "blur.png"), &DocumentCtx::new(0, "blur.png"))
        .await;

    assert_eq!(result.error_kind, Some(FailureKind::ParseInvalid));
    assert_eq!(
        result.validation_errors,
        vec!["Documento inválido: no se pudo extraer datos básicos".to_string()]
    );
    assert!(result.extracted_data.is_none());
}

#[tokio::test]
async fn batch_mode_keeps_submission_order() {
    let store = Arc::new(catalog());
    let scheduler = BatchScheduler::new(Arc::new(echo_flow(store, false)));
    let documents: Vec<RawDocument> = (0..5)
        .map(|i| {
            let text = receipt(
                &format!("22345679{}", i),
                "Ana Maria Rojas",
                &[("INF413", "SA", "SISTEMAS OPERATIVOS")],
            );
            document(&text, &format!("batch_{}.png", i))
        })
        .collect();

    let report = scheduler.run(documents, options(ProcessMode::Batch, 2)).await;

    assert_eq!(report.mode, ProcessMode::Batch);
    assert_eq!(report.successful_files, 5);
    let names: Vec<&str> = report.results.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["batch_0.png", "batch_1.png", "batch_2.png", "batch_3.png", "batch_4.png"]
    );
}

async fn peak_in_flight(mode: ProcessMode, batch_size: usize) -> usize {
    let ocr = InFlightOcr::default();
    let peak = ocr.peak.clone();
    let scheduler = BatchScheduler::new(Arc::new(flow(Arc::new(catalog()), vec![Box::new(ocr)], false)));
    let documents: Vec<RawDocument> = (0..5)
        .map(|i| {
            let text = receipt(
                &format!("22345670{}", i),
                "Juan Perez Lopez",
                &[("INF412", "SA", "PROGRAMACION III")],
            );
            document(&text, &format!("flight_{}.png", i))
        })
        .collect();

    let report = scheduler.run(documents, options(mode, batch_size)).await;
    assert_eq!(report.processed_files, 5);
    peak.load(Ordering::SeqCst)
}

#[tokio::test]
async fn sequential_mode_runs_one_document_at_a_time() {
    assert_eq!(peak_in_flight(ProcessMode::Sequential, 10).await, 1);
}

#[tokio::test]
async fn batch_mode_never_exceeds_batch_size() {
    let peak = peak_in_flight(ProcessMode::Batch, 2).await;
    assert!(peak <= 2, "peak in flight: {}", peak);
}

#[tokio::test]
async fn parallel_mode_starts_every_document_before_waiting() {
    assert_eq!(peak_in_flight(ProcessMode::Parallel, 1).await, 5);
}

#[tokio::test]
#[should_panic(expected = "ocr worker crashed")]
async fn task_panic_propagates_out_of_the_scheduler() {
    let scheduler = BatchScheduler::new(Arc::new(flow(
        Arc::new(catalog()),
        vec![Box::new(PanickingOcr)],
        false,
    )));
    scheduler
        .run(vec![document("a", "a.png")], options(ProcessMode::Parallel, 10))
        .await;
}

fn quota_race_store() -> LinkCountingStore {
    let accepted: Vec<SubjectKey> = (0..6)
        .map(|i| SubjectKey::new(format!("ECO10{}", i), "SB"))
        .collect();
    LinkCountingStore::new(
        catalog()
            .with_subject("INF414", "REDES DE COMPUTADORAS")
            .with_subject("INF415", "BASES DE DATOS")
            .with_offering(4, TERM, "INF414", "SA", Some("120363004@g.us"))
            .with_offering(5, TERM, "INF415", "SA", Some("120363005@g.us"))
            .with_student("test_223456789@c.us", "223456789", "Juan Perez Lopez", accepted),
    )
}

fn quota_race_documents() -> Vec<RawDocument> {
    let first = receipt(
        "223456789",
        "Juan Perez Lopez",
        &[("INF412", "SA", "PROGRAMACION III"), ("INF413", "SA", "SISTEMAS OPERATIVOS")],
    );
    let second = receipt(
        "223456789",
        "Juan Perez Lopez",
        &[("INF414", "SA", "REDES DE COMPUTADORAS"), ("INF415", "SA", "BASES DE DATOS")],
    );
    vec![document(&first, "first.png"), document(&second, "second.png")]
}

#[tokio::test]
async fn sequential_documents_for_one_identity_respect_the_quota() {
    let store: Arc<dyn EnrollmentStore> = Arc::new(quota_race_store());
    let scheduler = BatchScheduler::new(Arc::new(echo_flow(store, true)));

    let report = scheduler
        .run(quota_race_documents(), options(ProcessMode::Sequential, 10))
        .await;

    assert!(report.results[0].success);
    assert_eq!(report.results[1].error_kind, Some(FailureKind::QuotaExceeded));
}

/// 没有跨文档的锁：同一身份的两份文档并发校验时都看不到对方的写入，
/// 6 + 2 + 2 会超过上限 8，但两份都会被接受
#[tokio::test]
async fn concurrent_documents_for_one_identity_can_both_pass_the_quota() {
    let store = Arc::new(quota_race_store());
    let scheduler = BatchScheduler::new(Arc::new(echo_flow(store.clone(), true)));

    let report = scheduler
        .run(quota_race_documents(), options(ProcessMode::Parallel, 10))
        .await;

    assert_eq!(report.successful_files, 2);
    let accepted = store.accepted_subjects("test_223456789@c.us").await.unwrap();
    assert_eq!(accepted.len(), 10);
}

#[tokio::test]
async fn app_writes_report_and_failure_log() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("boletas");
    std::fs::create_dir(&input).unwrap();
    let good = receipt("223456789", "Juan Perez Lopez", &[("INF412", "SA", "PROGRAMACION III")]);
    std::fs::write(input.join("a_good.png"), good).unwrap();
    std::fs::write(input.join("b_blur.png"), "~~ ### ~~").unwrap();
    std::fs::write(input.join("notes.txt"), "ignored").unwrap();

    let report_path = dir.path().join("report.json");
    let log_path = dir.path().join("output.txt");
    let mut config = Config::default();
    config.input_folder = input.to_string_lossy().into_owned();
    config.report_file = report_path.to_string_lossy().into_owned();
    config.output_log_file = log_path.to_string_lossy().into_owned();
    config.scheduler.mode = ProcessMode::Sequential;

    let app = App::with_components(
        config,
        Arc::new(catalog()),
        OcrOrchestrator::new(vec![Box::new(EchoOcr)]),
    );
    let report = app.run().await.unwrap().expect("report");

    assert_eq!(report.total_files, 2);
    assert_eq!(report.successful_files, 1);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["totalFiles"], 2);
    assert_eq!(json["mode"], "sequential");
    assert_eq!(json["results"][1]["errorKind"], "parseInvalid");

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("文档 2 | b_blur.png"));
}

#[tokio::test]
async fn app_with_empty_folder_ends_gracefully() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.input_folder = dir.path().to_string_lossy().into_owned();
    config.report_file = dir.path().join("report.json").to_string_lossy().into_owned();
    config.output_log_file = dir.path().join("output.txt").to_string_lossy().into_owned();

    let app = App::with_components(
        config,
        Arc::new(InMemoryStore::new()),
        OcrOrchestrator::new(vec![Box::new(EchoOcr)]),
    );

    assert!(app.run().await.unwrap().is_none());
    assert!(!dir.path().join("report.json").exists());
}
