use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use ganado_ledger::models::{
    ExitCause, ExitCauseInput, LegacyRecord, NewLedgerRecord, NewPartner, NewSale, RecordDraft,
    RecordSubmission,
};
use ganado_ledger::{LedgerError, LedgerService, LedgerStore, MemoryLedgerStore};
use std::str::FromStr;
use std::sync::Arc;

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn setup() -> (Arc<MemoryLedgerStore>, LedgerService) {
    let store = Arc::new(MemoryLedgerStore::new());
    let service = LedgerService::new(store.clone());
    (store, service)
}

async fn partner(service: &LedgerService, name: &str) -> i64 {
    service
        .register_partner(NewPartner {
            name: name.to_string(),
            ..NewPartner::default()
        })
        .await
        .expect("register partner")
        .id
}

fn batch(partner_id: i64, date: NaiveDate, entries: i32, exits: i32) -> NewLedgerRecord {
    NewLedgerRecord {
        partner_id,
        date,
        entries,
        exits,
        total_weight: dec("100"),
        price_per_kilo: dec("10"),
        freight_cost: dec("300"),
        commission: dec("20"),
    }
}

fn submission(record: NewLedgerRecord) -> RecordSubmission {
    RecordSubmission {
        record,
        exit_causes: Vec::new(),
    }
}

#[tokio::test]
async fn three_same_day_batches_share_freight() {
    let (store, service) = setup();
    let ana = partner(&service, "ana").await;

    for _ in 0..3 {
        service.submit_record(submission(batch(ana, day(1), 10, 0))).await.unwrap();
    }

    let dashboard = service.load_dashboard().await.unwrap();
    assert_eq!(dashboard.records.len(), 3);
    assert!(dashboard.failed_updates.is_empty());
    for record in &dashboard.records {
        assert_eq!(record.total, dec("1100"));
        assert_eq!(record.per_animal_value, dec("110"));
        // 回写已落库
        assert_eq!(store.stored_record(record.id).unwrap().total, dec("1100"));
    }
    assert_eq!(dashboard.totals.accumulated_total, dec("3300"));
    assert_eq!(dashboard.totals.total_entries, 30);
}

#[tokio::test]
async fn new_batch_rewrites_existing_totals() {
    let (store, service) = setup();
    let ana = partner(&service, "ana").await;

    let first = service.submit_record(submission(batch(ana, day(1), 10, 0))).await.unwrap();
    assert_eq!(first.record.total, dec("1300"));

    let second = service.submit_record(submission(batch(ana, day(1), 10, 0))).await.unwrap();
    assert_eq!(second.record.total, dec("1150"));
    assert!(second
        .outcomes
        .iter()
        .any(|o| o.record_id == first.record.id && o.applied));

    // 第一条的原始字段未变, 但总额已随除数更新
    assert_eq!(store.stored_record(first.record.id).unwrap().total, dec("1150"));
}

#[tokio::test]
async fn other_partners_and_days_do_not_share() {
    let (_, service) = setup();
    let ana = partner(&service, "ana").await;
    let luis = partner(&service, "luis").await;

    service.submit_record(submission(batch(ana, day(1), 10, 0))).await.unwrap();
    service.submit_record(submission(batch(ana, day(2), 10, 0))).await.unwrap();
    service.submit_record(submission(batch(luis, day(1), 10, 0))).await.unwrap();

    let dashboard = service.load_dashboard().await.unwrap();
    for record in &dashboard.records {
        assert_eq!(record.total, dec("1300"));
    }
}

#[tokio::test]
async fn preview_counts_pending_record() {
    let (_, service) = setup();
    let ana = partner(&service, "ana").await;
    service.submit_record(submission(batch(ana, day(1), 10, 0))).await.unwrap();
    service.submit_record(submission(batch(ana, day(1), 10, 0))).await.unwrap();

    let draft = RecordDraft {
        partner_id: Some(ana),
        date: Some(day(1)),
        entries: 4,
        exits: 0,
        total_weight: dec("100"),
        price_per_kilo: dec("10"),
        freight_cost: dec("300"),
    };
    let preview = service.preview(&draft).await.unwrap();
    assert_eq!(preview.divisor, 3);
    assert_eq!(preview.total, dec("1100"));
    assert_eq!(preview.per_animal_value, dec("275"));

    let no_partner = RecordDraft {
        partner_id: None,
        ..draft
    };
    assert_eq!(service.preview(&no_partner).await.unwrap().divisor, 1);

    // 预览不落库
    assert_eq!(service.load_dashboard().await.unwrap().records.len(), 2);
}

#[tokio::test]
async fn preview_rejects_negative_counts() {
    let (_, service) = setup();
    let ana = partner(&service, "ana").await;

    let draft = RecordDraft {
        partner_id: Some(ana),
        date: Some(day(1)),
        entries: i32::MIN,
        exits: 1,
        ..RecordDraft::default()
    };
    let result = service.preview(&draft).await;
    assert!(matches!(result, Err(LedgerError::InvalidInput(_))));
}

#[tokio::test]
async fn mismatched_exit_causes_block_submission() {
    let (store, service) = setup();
    let ana = partner(&service, "ana").await;

    let bad = RecordSubmission {
        record: batch(ana, day(1), 10, 4),
        exit_causes: vec![
            ExitCauseInput::new(ExitCause::Sale, 3),
            ExitCauseInput::new(ExitCause::Death, 2),
        ],
    };
    match service.submit_record(bad).await {
        Err(LedgerError::AllocationMismatch { assigned, expected }) => {
            assert_eq!((assigned, expected), (5, 4));
        }
        other => panic!("expected mismatch, got {:?}", other.map(|s| s.record.id)),
    }

    // 校验失败时不写入任何数据
    assert!(store.load_all_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn exit_causes_are_saved_without_zero_entries() {
    let (_, service) = setup();
    let ana = partner(&service, "ana").await;

    let submitted = service
        .submit_record(RecordSubmission {
            record: batch(ana, day(1), 10, 4),
            exit_causes: vec![
                ExitCauseInput::new(ExitCause::Sale, 3),
                ExitCauseInput::new(ExitCause::Death, 1),
                ExitCauseInput::new(ExitCause::Theft, 0),
            ],
        })
        .await
        .unwrap();
    assert_eq!(submitted.record.balance, 6);

    let details = service.exit_details(submitted.record.id).await.unwrap();
    let causes: Vec<_> = details.iter().map(|d| (d.cause, d.quantity)).collect();
    assert_eq!(causes, vec![(ExitCause::Sale, 3), (ExitCause::Death, 1)]);
}

#[tokio::test]
async fn edit_moves_record_between_groups() {
    let (store, service) = setup();
    let ana = partner(&service, "ana").await;

    let first = service.submit_record(submission(batch(ana, day(1), 10, 0))).await.unwrap();
    let second = service.submit_record(submission(batch(ana, day(1), 10, 0))).await.unwrap();
    assert_eq!(store.stored_record(first.record.id).unwrap().total, dec("1150"));

    let edited = service
        .edit_record(second.record.id, batch(ana, day(2), 10, 0))
        .await
        .unwrap();
    assert_eq!(edited.record.date, day(2));
    assert_eq!(edited.record.total, dec("1300"));
    assert_eq!(store.stored_record(first.record.id).unwrap().total, dec("1300"));

    let missing = service.edit_record(9999, batch(ana, day(2), 1, 0)).await;
    assert!(matches!(missing, Err(LedgerError::RecordNotFound(9999))));
}

#[tokio::test]
async fn edit_keeps_exits_consistent_with_saved_causes() {
    let (store, service) = setup();
    let ana = partner(&service, "ana").await;

    let saved = service
        .submit_record(RecordSubmission {
            record: batch(ana, day(1), 10, 4),
            exit_causes: vec![
                ExitCauseInput::new(ExitCause::Sale, 3),
                ExitCauseInput::new(ExitCause::Death, 1),
            ],
        })
        .await
        .unwrap();
    let id = saved.record.id;

    let result = service.edit_record(id, batch(ana, day(1), 10, 2)).await;
    assert!(matches!(
        result,
        Err(LedgerError::AllocationMismatch {
            assigned: 4,
            expected: 2
        })
    ));
    assert_eq!(store.stored_record(id).unwrap().exits, 4);

    // 出栏数不变时其他字段可以修改
    let edited = service.edit_record(id, batch(ana, day(1), 12, 4)).await.unwrap();
    assert_eq!(edited.record.entries, 12);
    assert_eq!(edited.record.balance, 8);
}

#[tokio::test]
async fn exit_causes_can_be_attached_after_saving() {
    let (store, service) = setup();
    let ana = partner(&service, "ana").await;

    let saved = service.submit_record(submission(batch(ana, day(1), 10, 5))).await.unwrap();
    let id = saved.record.id;
    assert!(service.exit_details(id).await.unwrap().is_empty());

    let short = service
        .attach_exit_causes(id, vec![ExitCauseInput::new(ExitCause::Sale, 4)])
        .await;
    assert!(matches!(
        short,
        Err(LedgerError::AllocationMismatch {
            assigned: 4,
            expected: 5
        })
    ));
    assert!(store.load_exit_causes(id).await.unwrap().is_empty());

    let details = service
        .attach_exit_causes(
            id,
            vec![
                ExitCauseInput::new(ExitCause::Sale, 3),
                ExitCauseInput::new(ExitCause::Theft, 0),
                ExitCauseInput::new(ExitCause::Death, 2),
            ],
        )
        .await
        .unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details.iter().map(|d| d.quantity).sum::<i64>(), 5);

    let twice = service
        .attach_exit_causes(id, vec![ExitCauseInput::new(ExitCause::Sale, 5)])
        .await;
    assert!(matches!(twice, Err(LedgerError::InvalidInput(_))));

    let missing = service.attach_exit_causes(9999, Vec::new()).await;
    assert!(matches!(missing, Err(LedgerError::RecordNotFound(9999))));
}

#[tokio::test]
async fn failed_derived_update_does_not_abort_the_rest() {
    let (store, service) = setup();
    let ana = partner(&service, "ana").await;

    let first = service.submit_record(submission(batch(ana, day(1), 10, 0))).await.unwrap();
    let second = service.submit_record(submission(batch(ana, day(1), 10, 0))).await.unwrap();
    store.fail_derived_updates_for(first.record.id);

    let third = service.submit_record(submission(batch(ana, day(1), 10, 0))).await.unwrap();
    let failed: Vec<i64> = third
        .outcomes
        .iter()
        .filter(|o| !o.applied)
        .map(|o| o.record_id)
        .collect();
    assert_eq!(failed, vec![first.record.id]);

    // 失败的记录保留旧值, 其余已更新
    assert_eq!(store.stored_record(first.record.id).unwrap().total, dec("1150"));
    assert_eq!(store.stored_record(second.record.id).unwrap().total, dec("1100"));

    // 下次全量加载时补上
    store.clear_failures();
    let dashboard = service.load_dashboard().await.unwrap();
    assert!(dashboard.failed_updates.is_empty());
    assert_eq!(store.stored_record(first.record.id).unwrap().total, dec("1100"));
}

#[tokio::test]
async fn partner_names_are_unique_and_uppercase() {
    let (_, service) = setup();
    let created = service
        .register_partner(NewPartner {
            name: "  maría gómez ".to_string(),
            phone: Some("".to_string()),
            ..NewPartner::default()
        })
        .await
        .unwrap();
    assert_eq!(created.name, "MARÍA GÓMEZ");
    assert!(created.active);
    assert_eq!(created.phone, None);

    let duplicate = service
        .register_partner(NewPartner {
            name: "María Gómez".to_string(),
            ..NewPartner::default()
        })
        .await;
    assert!(matches!(duplicate, Err(LedgerError::DuplicatePartner(_))));

    let empty = service.register_partner(NewPartner::default()).await;
    assert!(matches!(empty, Err(LedgerError::InvalidInput(_))));

    partner(&service, "beto").await;
    let names: Vec<String> = service
        .list_partners()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["BETO".to_string(), "MARÍA GÓMEZ".to_string()]);
}

#[tokio::test]
async fn unknown_partner_is_rejected() {
    let (_, service) = setup();
    let result = service.submit_record(submission(batch(42, day(1), 1, 0))).await;
    assert!(matches!(result, Err(LedgerError::PartnerNotFound(42))));
}

#[tokio::test]
async fn partner_summary_adds_records_and_sales() {
    let (_, service) = setup();
    let ana = partner(&service, "ana").await;
    let luis = partner(&service, "luis").await;

    service.submit_record(submission(batch(ana, day(1), 10, 0))).await.unwrap();
    let with_exits = service
        .submit_record(RecordSubmission {
            record: batch(ana, day(1), 5, 3),
            exit_causes: vec![ExitCauseInput::new(ExitCause::Sale, 3)],
        })
        .await
        .unwrap();
    service.submit_record(submission(batch(luis, day(1), 7, 0))).await.unwrap();

    service
        .record_sale(NewSale {
            partner_id: ana,
            record_id: Some(with_exits.record.id),
            date: day(1),
            quantity: 3,
            kind: ExitCause::Sale,
            price_per_kilo: dec("9.5"),
            total_kilos: dec("1000"),
        })
        .await
        .unwrap();
    service
        .record_sale(NewSale {
            partner_id: ana,
            record_id: None,
            date: day(2),
            quantity: 1,
            kind: ExitCause::Death,
            price_per_kilo: dec("0"),
            total_kilos: dec("0"),
        })
        .await
        .unwrap();

    let summary = service.partner_summary(ana).await.unwrap();
    assert_eq!(summary.partner_name, "ANA");
    assert_eq!(summary.totals.record_count, 2);
    assert_eq!(summary.totals.total_entries, 15);
    assert_eq!(summary.totals.total_exits, 3);
    assert_eq!(summary.totals.herd_balance, 12);
    assert_eq!(summary.totals.accumulated_total, dec("2300"));
    assert_eq!(summary.sales_value, dec("9500"));

    let records = service.partner_records(ana).await.unwrap();
    assert!(records.iter().all(|r| r.partner_id == ana));
}

#[tokio::test]
async fn sale_for_missing_record_fails() {
    let (_, service) = setup();
    let ana = partner(&service, "ana").await;

    let result = service
        .record_sale(NewSale {
            partner_id: ana,
            record_id: Some(77),
            date: day(1),
            quantity: 1,
            kind: ExitCause::Theft,
            price_per_kilo: dec("0"),
            total_kilos: dec("0"),
        })
        .await;
    assert!(matches!(result, Err(LedgerError::RecordNotFound(77))));
}

fn legacy(id: i64, name: &str, date: NaiveDate) -> LegacyRecord {
    LegacyRecord {
        id,
        partner_name: name.to_string(),
        date,
        entries: 10,
        exits: 0,
        total_weight: dec("100"),
        price_per_kilo: dec("10"),
        freight_cost: dec("300"),
        commission: dec("0"),
    }
}

#[tokio::test]
async fn legacy_rows_are_imported_once() {
    let (store, service) = setup();
    let luis = partner(&service, "luis").await;
    store.seed_legacy(vec![
        legacy(1, "Ana", day(1)),
        legacy(2, "ana ", day(1)),
        legacy(3, "LUIS", day(1)),
        legacy(4, "", day(1)),
    ]);

    let report = service.import_legacy().await.unwrap();
    assert_eq!(report.imported, 3);
    assert_eq!(report.partners_created, vec!["ANA".to_string()]);

    let dashboard = service.load_dashboard().await.unwrap();
    let luis_total: Vec<_> = dashboard
        .records
        .iter()
        .filter(|r| r.partner_id == luis)
        .map(|r| r.total.clone())
        .collect();
    assert_eq!(luis_total, vec![dec("1300")]);
    assert!(dashboard
        .records
        .iter()
        .filter(|r| r.partner_id != luis)
        .all(|r| r.total == dec("1150")));

    let again = service.import_legacy().await.unwrap();
    assert_eq!(again.imported, 0);
    assert!(again.partners_created.is_empty());
    assert_eq!(service.load_dashboard().await.unwrap().records.len(), 3);
}

#[tokio::test]
async fn interrupted_legacy_import_resumes() {
    let (store, service) = setup();
    store.seed_legacy(vec![
        legacy(1, "ana", day(1)),
        legacy(2, "ana", day(1)),
        legacy(3, "luis", day(2)),
    ]);
    store.fail_legacy_import_for(2);

    let failed = service.import_legacy().await;
    assert!(matches!(failed, Err(LedgerError::Store(_))));
    assert_eq!(store.load_all_records().await.unwrap().len(), 1);

    store.clear_failures();
    let report = service.import_legacy().await.unwrap();
    assert_eq!(report.imported, 2);
    assert_eq!(report.partners_created, vec!["LUIS".to_string()]);

    let dashboard = service.load_dashboard().await.unwrap();
    assert_eq!(dashboard.records.len(), 3);
    let ana_totals: Vec<_> = dashboard
        .records
        .iter()
        .filter(|r| r.date == day(1))
        .map(|r| r.total.clone())
        .collect();
    assert_eq!(ana_totals, vec![dec("1150"), dec("1150")]);
}

#[tokio::test]
async fn csv_export_uses_partner_names() {
    let (_, service) = setup();
    let ana = partner(&service, "ana").await;
    service.submit_record(submission(batch(ana, day(1), 10, 0))).await.unwrap();

    let csv = String::from_utf8(service.export_csv().await.unwrap()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains(",ANA,2024-03-01,10,0,10,"));
}

#[tokio::test]
async fn csv_export_names_inactive_partners() {
    let (store, service) = setup();
    let ana = partner(&service, "ana").await;
    service.submit_record(submission(batch(ana, day(1), 10, 0))).await.unwrap();
    store.deactivate_partner(ana);

    let csv = String::from_utf8(service.export_csv().await.unwrap()).unwrap();
    assert!(csv.lines().nth(1).unwrap().contains(",ANA,2024-03-01,"));
}
