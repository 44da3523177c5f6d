//! JSON directory store against a temporary directory.

use chrono::{TimeZone, Utc};

use dte_core::document::fixtures;
use dte_core::{AuthorityResponse, BusinessId, Dte, Environment, FlowType, PeriodKey};
use dte_store::{
    AccumulatorStore, DocumentClass, DocumentRecord, DocumentState, DocumentStore, JsonDirStore,
    ResponseRecord,
};
use dte_tax::MonthlyAccumulator;

fn business() -> BusinessId {
    BusinessId::new("06140101901013").unwrap()
}

fn record(dte: Dte) -> DocumentRecord {
    DocumentRecord {
        generation_code: dte.generation_code().clone(),
        business_id: Some(business()),
        environment: Environment::Sandbox,
        document_type: dte.document_type(),
        control_number: dte.identification.control_number.clone(),
        state: DocumentState::Processed,
        class: DocumentClass::Issued,
        signature: None,
        signature_digest: None,
        authority_response: Some(AuthorityResponse::accepted("SELLO-1", "2024-01-15T10:30:05")),
        receipt_stamp: Some("SELLO-1".into()),
        processed_at: Some(Utc.with_ymd_and_hms(2024, 1, 15, 16, 30, 5).unwrap()),
        original_attempt: None,
        updated_at: Utc.with_ymd_and_hms(2024, 1, 15, 16, 30, 5).unwrap(),
        document: dte,
    }
}

#[tokio::test]
async fn document_upsert_overwrites_by_generation_code() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::open(dir.path()).await.unwrap();
    let dte = Dte::from_value(fixtures::voucher_json()).unwrap();
    let code = dte.generation_code().clone();

    let mut rec = record(dte);
    DocumentStore::upsert(&store, rec.clone()).await.unwrap();
    rec.state = DocumentState::Contingency;
    DocumentStore::upsert(&store, rec.clone()).await.unwrap();

    let got = DocumentStore::get(&store, &code).await.unwrap().unwrap();
    assert_eq!(got, rec);
    let files = std::fs::read_dir(dir.path().join("documents")).unwrap().count();
    assert_eq!(files, 1);
}

#[tokio::test]
async fn missing_records_are_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::open(dir.path()).await.unwrap();
    let dte = Dte::from_value(fixtures::voucher_json()).unwrap();
    assert!(DocumentStore::get(&store, dte.generation_code())
        .await
        .unwrap()
        .is_none());
    assert!(store
        .get_response(dte.generation_code())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn response_records_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::open(dir.path()).await.unwrap();
    let dte = Dte::from_value(fixtures::voucher_json()).unwrap();
    let rec = ResponseRecord {
        generation_code: dte.generation_code().clone(),
        business_id: Some(business()),
        response: AuthorityResponse::accepted("SELLO-1", "2024-01-15T10:30:05"),
        recorded_at: Utc.with_ymd_and_hms(2024, 1, 15, 16, 30, 6).unwrap(),
    };
    store.upsert_response(rec.clone()).await.unwrap();
    assert_eq!(
        store.get_response(dte.generation_code()).await.unwrap(),
        Some(rec)
    );
}

#[tokio::test]
async fn accumulators_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap();
    let period = PeriodKey::new(2024, 1).unwrap();
    {
        let store = JsonDirStore::open(dir.path()).await.unwrap();
        let mut acc = MonthlyAccumulator::empty(business(), period, now);
        let dte = Dte::from_value(fixtures::voucher_json()).unwrap();
        acc.apply(&dte, FlowType::Emission, now).unwrap();
        AccumulatorStore::upsert(&store, acc).await.unwrap();
    }

    let store = JsonDirStore::open(dir.path()).await.unwrap();
    let acc = AccumulatorStore::get(&store, &business(), period, "ALL")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(acc.document_count, 1);
    assert_eq!(store.list(&business(), 2024).await.unwrap().len(), 1);
    assert!(store.list(&business(), 2023).await.unwrap().is_empty());
    assert!(store.delete(&business(), period, "ALL").await.unwrap());
    assert!(AccumulatorStore::get(&store, &business(), period, "ALL")
        .await
        .unwrap()
        .is_none());
}
