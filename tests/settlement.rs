//! End-to-end settlement engine behavior over the in-memory store.

use chrono::NaiveDate;

use wagebook::error::EngineError;
use wagebook::model::{AttendanceStatus, SHORTFALL_REASON_PREFIX, SalaryStatus};
use wagebook::salary::SettlementEngine;
use wagebook::salary::engine::{AddExpense, GiveAdvance, MarkAttendance};
use wagebook::store::memory::MemoryStore;
use wagebook::store::{AttendancePatch, ExpensePatch, NewWorker, RecordFilter};

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

async fn engine_with_worker(
    wage: f64,
    ot_rate: f64,
    opening_balance: f64,
) -> (SettlementEngine<MemoryStore>, u64) {
    let engine = SettlementEngine::new(MemoryStore::new());
    let worker = engine
        .register_worker(NewWorker {
            name: "Rahim".into(),
            phone: None,
            wage,
            ot_rate,
            joined_at: d("2024-01-01"),
            opening_balance,
        })
        .await
        .unwrap();
    (engine, worker.id)
}

async fn mark(
    engine: &SettlementEngine<MemoryStore>,
    worker_id: u64,
    date: &str,
    status: AttendanceStatus,
    ot_units: f64,
) {
    engine
        .mark_attendance(MarkAttendance {
            worker_id,
            date: d(date),
            status,
            ot_units,
        })
        .await
        .unwrap();
}

#[actix_web::test]
async fn breakdown_for_one_present_day_with_overtime() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 0.0).await;
    mark(&engine, worker_id, "2024-01-15", AttendanceStatus::Present, 2.0).await;

    let b = engine
        .calculate_breakdown(worker_id, Some(d("2024-01-31")))
        .await
        .unwrap();

    assert_eq!(b.cycle_start, d("2024-01-01"));
    assert_eq!(b.cycle_end, d("2024-01-31"));
    assert_eq!(b.base_pay, 500.0);
    assert_eq!(b.ot_pay, 100.0);
    assert_eq!(b.gross_pay, 600.0);
    assert_eq!(b.total_days, 1.0);
    assert_eq!(b.net_pay, 600.0);
}

#[actix_web::test]
async fn consecutive_cycles_are_contiguous() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 0.0).await;
    mark(&engine, worker_id, "2024-01-10", AttendanceStatus::Present, 0.0).await;

    let first = engine
        .create_salary(worker_id, Some(d("2024-01-31")))
        .await
        .unwrap();
    assert_eq!(first.cycle_start, d("2024-01-01"));
    assert_eq!(first.cycle_end, d("2024-01-31"));

    mark(&engine, worker_id, "2024-02-10", AttendanceStatus::Present, 0.0).await;
    let second = engine
        .create_salary(worker_id, Some(d("2024-02-29")))
        .await
        .unwrap();
    assert_eq!(second.cycle_start, d("2024-02-01"));
    assert_eq!(second.cycle_end, d("2024-02-29"));
}

#[actix_web::test]
async fn backdated_settlement_into_settled_history_fails() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 0.0).await;
    engine
        .create_salary(worker_id, Some(d("2024-01-31")))
        .await
        .unwrap();

    let err = engine
        .create_salary(worker_id, Some(d("2024-01-15")))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));

    // preview of the same inverted window is an all-zero breakdown
    let b = engine
        .calculate_breakdown(worker_id, Some(d("2024-01-15")))
        .await
        .unwrap();
    assert_eq!(b.gross_pay, 0.0);
    assert_eq!(b.net_pay, 0.0);
}

#[actix_web::test]
async fn negative_net_becomes_a_shortfall_advance() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 0.0).await;
    mark(&engine, worker_id, "2024-01-15", AttendanceStatus::Present, 2.0).await;
    engine
        .give_advance(GiveAdvance {
            worker_id,
            date: d("2024-01-20"),
            amount: 800.0,
            reason: None,
        })
        .await
        .unwrap();

    // gross 600, advances 800
    let cycle = engine
        .create_salary(worker_id, Some(d("2024-01-31")))
        .await
        .unwrap();
    assert_eq!(cycle.gross_pay, 600.0);
    assert_eq!(cycle.total_advance, 800.0);
    assert_eq!(cycle.net_pay, 0.0);

    let advances = engine
        .list_advances(&RecordFilter::worker(worker_id))
        .await
        .unwrap();
    let shortfall = advances
        .iter()
        .find(|a| a.is_shortfall())
        .expect("shortfall advance created");
    assert_eq!(shortfall.amount, 200.0);
    assert_eq!(shortfall.date, d("2024-01-31"));
    assert!(
        shortfall
            .reason
            .as_deref()
            .unwrap()
            .starts_with(SHORTFALL_REASON_PREFIX)
    );
    assert!(shortfall.salary_id.is_none(), "stays outstanding");

    // the original 800 advance was consumed by the cycle
    let consumed = advances.iter().find(|a| a.amount == 800.0).unwrap();
    assert_eq!(consumed.salary_id, Some(cycle.id));

    // next cycle folds the shortfall into its deductions exactly once
    mark(&engine, worker_id, "2024-02-10", AttendanceStatus::Present, 0.0).await;
    let next = engine
        .create_salary(worker_id, Some(d("2024-02-29")))
        .await
        .unwrap();
    assert_eq!(next.total_advance, 200.0);
    assert_eq!(next.net_pay, 300.0);
}

#[actix_web::test]
async fn partial_then_full_payment_state_machine() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 0.0).await;
    mark(&engine, worker_id, "2024-01-15", AttendanceStatus::Present, 2.0).await;
    let cycle = engine
        .create_salary(worker_id, Some(d("2024-01-31")))
        .await
        .unwrap();
    assert_eq!(cycle.status, SalaryStatus::Pending);
    assert_eq!(cycle.net_pay, 600.0);

    let after_partial = engine
        .issue_salary(cycle.id, 250.0, Some("cash".into()), None)
        .await
        .unwrap();
    assert_eq!(after_partial.status, SalaryStatus::Partial);
    assert_eq!(after_partial.total_paid, 250.0);
    assert_eq!(after_partial.remaining(), 350.0);
    assert!(after_partial.issued_at.is_some());

    // cannot overpay the remainder
    let err = engine
        .issue_salary(cycle.id, 400.0, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AmountExceeded { .. }));

    let paid = engine.issue_salary(cycle.id, 350.0, None, None).await.unwrap();
    assert_eq!(paid.status, SalaryStatus::Paid);
    assert_eq!(paid.total_paid, paid.net_pay);

    // a settled cycle takes no more payments
    let err = engine.issue_salary(cycle.id, 1.0, None, None).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadySettled(_)));

    // the payment ledger sums to total_paid, and the worker's running
    // balance tracks everything paid out
    let payments = engine.list_payments(cycle.id).await.unwrap();
    let total: f64 = payments.iter().map(|p| p.amount).sum();
    assert_eq!(total, 600.0);
    assert_eq!(engine.get_worker(worker_id).await.unwrap().balance, 600.0);
}

#[actix_web::test]
async fn non_positive_payment_is_rejected() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 0.0).await;
    mark(&engine, worker_id, "2024-01-15", AttendanceStatus::Present, 0.0).await;
    let cycle = engine
        .create_salary(worker_id, Some(d("2024-01-31")))
        .await
        .unwrap();

    let err = engine.issue_salary(cycle.id, 0.0, None, None).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[actix_web::test]
async fn lump_sum_clears_oldest_cycles_first() {
    let (engine, worker_id) = engine_with_worker(100.0, 0.0, 0.0).await;

    // older cycle: net 100
    mark(&engine, worker_id, "2024-01-10", AttendanceStatus::Present, 0.0).await;
    let older = engine
        .create_salary(worker_id, Some(d("2024-01-31")))
        .await
        .unwrap();
    assert_eq!(older.net_pay, 100.0);

    // newer cycle: net 300
    mark(&engine, worker_id, "2024-02-05", AttendanceStatus::Present, 0.0).await;
    mark(&engine, worker_id, "2024-02-06", AttendanceStatus::Present, 0.0).await;
    mark(&engine, worker_id, "2024-02-07", AttendanceStatus::Present, 0.0).await;
    let newer = engine
        .create_salary(worker_id, Some(d("2024-02-29")))
        .await
        .unwrap();
    assert_eq!(newer.net_pay, 300.0);
    assert_eq!(newer.unpaid_balance, 100.0);

    let summary = engine
        .pay_worker(worker_id, 250.0, None, None, None)
        .await
        .unwrap();
    assert_eq!(summary.cycles.len(), 2);
    assert_eq!(summary.cycles[0].id, older.id);
    assert_eq!(summary.cycles[0].status, SalaryStatus::Paid);
    assert_eq!(summary.cycles[1].id, newer.id);
    assert_eq!(summary.cycles[1].status, SalaryStatus::Partial);
    assert_eq!(summary.cycles[1].remaining(), 150.0);
}

#[actix_web::test]
async fn lump_sum_leftover_settles_a_fresh_cycle() {
    let (engine, worker_id) = engine_with_worker(100.0, 0.0, 0.0).await;

    mark(&engine, worker_id, "2024-01-10", AttendanceStatus::Present, 0.0).await;
    let older = engine
        .create_salary(worker_id, Some(d("2024-01-31")))
        .await
        .unwrap();

    mark(&engine, worker_id, "2024-02-05", AttendanceStatus::Present, 0.0).await;
    mark(&engine, worker_id, "2024-02-06", AttendanceStatus::Present, 0.0).await;

    // 100 clears the older cycle, 150 goes into a freshly settled cycle
    let summary = engine
        .pay_worker(worker_id, 250.0, Some(d("2024-02-29")), None, None)
        .await
        .unwrap();
    assert_eq!(summary.cycles.len(), 2);
    assert_eq!(summary.cycles[0].id, older.id);
    assert_eq!(summary.cycles[0].status, SalaryStatus::Paid);

    let fresh = &summary.cycles[1];
    assert_eq!(fresh.cycle_start, d("2024-02-01"));
    assert_eq!(fresh.net_pay, 200.0);
    assert_eq!(fresh.total_paid, 150.0);
    assert_eq!(fresh.status, SalaryStatus::Partial);
}

#[actix_web::test]
async fn paid_cycles_lock_their_windows() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 0.0).await;
    mark(&engine, worker_id, "2024-01-15", AttendanceStatus::Present, 0.0).await;
    let cycle = engine
        .create_salary(worker_id, Some(d("2024-01-31")))
        .await
        .unwrap();

    let records = engine
        .list_attendance(&RecordFilter::worker(worker_id))
        .await
        .unwrap();
    let record_id = records[0].id;

    // a pending cycle locks nothing
    assert!(!engine.is_locked(worker_id, d("2024-01-15")).await.unwrap());
    engine
        .update_attendance(
            record_id,
            AttendancePatch {
                status: Some(AttendanceStatus::Half),
                ot_units: None,
            },
        )
        .await
        .unwrap();

    // partial payment freezes the window
    engine.issue_salary(cycle.id, 100.0, None, None).await.unwrap();
    assert!(engine.is_locked(worker_id, d("2024-01-15")).await.unwrap());
    assert!(!engine.is_locked(worker_id, d("2024-02-01")).await.unwrap());

    let err = engine
        .update_attendance(
            record_id,
            AttendancePatch {
                status: Some(AttendanceStatus::Present),
                ot_units: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RecordLocked { .. }));

    let err = engine.delete_attendance(record_id).await.unwrap_err();
    assert!(matches!(err, EngineError::RecordLocked { .. }));

    // marking a new day inside the settled window is also rejected
    let err = engine
        .mark_attendance(MarkAttendance {
            worker_id,
            date: d("2024-01-20"),
            status: AttendanceStatus::Present,
            ot_units: 0.0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RecordLocked { .. }));

    // outside the window everything still works
    mark(&engine, worker_id, "2024-02-01", AttendanceStatus::Present, 0.0).await;

    let periods = engine.paid_periods(worker_id).await.unwrap();
    assert_eq!(periods.len(), 1);
    assert_eq!(periods[0].start, d("2024-01-01"));
    assert_eq!(periods[0].end, d("2024-01-31"));
    assert_eq!(periods[0].paid_amount, 100.0);
    assert_eq!(periods[0].remaining_amount, 400.0);
}

#[actix_web::test]
async fn advance_allowed_on_the_boundary_day_of_a_paid_cycle() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 0.0).await;
    mark(&engine, worker_id, "2024-01-15", AttendanceStatus::Present, 0.0).await;
    let cycle = engine
        .create_salary(worker_id, Some(d("2024-01-31")))
        .await
        .unwrap();
    engine.issue_salary(cycle.id, 500.0, None, None).await.unwrap();

    // inside the paid window: rejected
    let err = engine
        .give_advance(GiveAdvance {
            worker_id,
            date: d("2024-01-30"),
            amount: 50.0,
            reason: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RecordLocked { .. }));

    // on the cycle-end day itself: allowed (exclusive upper bound)
    engine
        .give_advance(GiveAdvance {
            worker_id,
            date: d("2024-01-31"),
            amount: 50.0,
            reason: None,
        })
        .await
        .unwrap();
}

#[actix_web::test]
async fn consumed_advances_are_frozen() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 0.0).await;
    mark(&engine, worker_id, "2024-01-15", AttendanceStatus::Present, 0.0).await;
    let advance = engine
        .give_advance(GiveAdvance {
            worker_id,
            date: d("2024-01-20"),
            amount: 100.0,
            reason: Some("lunch money".into()),
        })
        .await
        .unwrap();

    // while unconsumed it can be edited
    engine
        .update_advance(
            advance.id,
            wagebook::store::AdvancePatch {
                amount: Some(120.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    engine
        .create_salary(worker_id, Some(d("2024-01-31")))
        .await
        .unwrap();

    let err = engine
        .update_advance(
            advance.id,
            wagebook::store::AdvancePatch {
                amount: Some(90.0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RecordLocked { .. }));

    let err = engine.delete_advance(advance.id).await.unwrap_err();
    assert!(matches!(err, EngineError::RecordLocked { .. }));
}

#[actix_web::test]
async fn opening_balance_applies_to_the_first_cycle_only() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 300.0).await;
    mark(&engine, worker_id, "2024-01-15", AttendanceStatus::Present, 0.0).await;
    let first = engine
        .create_salary(worker_id, Some(d("2024-01-31")))
        .await
        .unwrap();
    assert_eq!(first.net_pay, 800.0);
    engine.issue_salary(first.id, 800.0, None, None).await.unwrap();

    mark(&engine, worker_id, "2024-02-10", AttendanceStatus::Present, 0.0).await;
    let second = engine
        .create_salary(worker_id, Some(d("2024-02-29")))
        .await
        .unwrap();
    assert_eq!(second.net_pay, 500.0);
}

#[actix_web::test]
async fn inactive_worker_cannot_receive_records() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 0.0).await;
    engine
        .update_worker(
            worker_id,
            wagebook::store::WorkerPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = engine
        .mark_attendance(MarkAttendance {
            worker_id,
            date: d("2024-01-15"),
            status: AttendanceStatus::Present,
            ot_units: 0.0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InactiveWorker(_)));

    let err = engine
        .give_advance(GiveAdvance {
            worker_id,
            date: d("2024-01-15"),
            amount: 10.0,
            reason: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InactiveWorker(_)));
}

#[actix_web::test]
async fn inactive_worker_records_cannot_be_deleted() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 0.0).await;
    mark(&engine, worker_id, "2024-01-15", AttendanceStatus::Present, 0.0).await;
    let advance = engine
        .give_advance(GiveAdvance {
            worker_id,
            date: d("2024-01-20"),
            amount: 100.0,
            reason: None,
        })
        .await
        .unwrap();
    let expense = engine
        .add_expense(AddExpense {
            worker_id,
            date: d("2024-01-18"),
            amount: 120.0,
            type_id: 1,
            note: None,
        })
        .await
        .unwrap();
    let records = engine
        .list_attendance(&RecordFilter::worker(worker_id))
        .await
        .unwrap();

    engine
        .update_worker(
            worker_id,
            wagebook::store::WorkerPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = engine.delete_attendance(records[0].id).await.unwrap_err();
    assert!(matches!(err, EngineError::InactiveWorker(_)));

    let err = engine.delete_advance(advance.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InactiveWorker(_)));

    let err = engine.delete_expense(expense.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InactiveWorker(_)));
}

#[actix_web::test]
async fn future_dated_records_are_rejected() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 0.0).await;
    let tomorrow = chrono::Utc::now()
        .date_naive()
        .succ_opt()
        .unwrap();

    let err = engine
        .mark_attendance(MarkAttendance {
            worker_id,
            date: tomorrow,
            status: AttendanceStatus::Present,
            ot_units: 0.0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));

    let err = engine
        .give_advance(GiveAdvance {
            worker_id,
            date: tomorrow,
            amount: 50.0,
            reason: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));

    let err = engine
        .add_expense(AddExpense {
            worker_id,
            date: tomorrow,
            amount: 50.0,
            type_id: 1,
            note: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));
}

#[actix_web::test]
async fn expenses_inside_a_settled_window_are_frozen() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 0.0).await;
    mark(&engine, worker_id, "2024-01-15", AttendanceStatus::Present, 0.0).await;
    let expense = engine
        .add_expense(AddExpense {
            worker_id,
            date: d("2024-01-18"),
            amount: 120.0,
            type_id: 1,
            note: None,
        })
        .await
        .unwrap();

    let cycle = engine
        .create_salary(worker_id, Some(d("2024-01-31")))
        .await
        .unwrap();
    assert_eq!(cycle.net_pay, 380.0);
    engine.issue_salary(cycle.id, 100.0, None, None).await.unwrap();

    let err = engine
        .update_expense(
            expense.id,
            ExpensePatch {
                amount: Some(90.0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RecordLocked { .. }));

    let err = engine.delete_expense(expense.id).await.unwrap_err();
    assert!(matches!(err, EngineError::RecordLocked { .. }));

    // adding a new expense dated inside the settled window is also rejected
    let err = engine
        .add_expense(AddExpense {
            worker_id,
            date: d("2024-01-20"),
            amount: 30.0,
            type_id: 1,
            note: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RecordLocked { .. }));

    // outside the window it still works
    engine
        .add_expense(AddExpense {
            worker_id,
            date: d("2024-02-01"),
            amount: 30.0,
            type_id: 1,
            note: None,
        })
        .await
        .unwrap();
}

#[actix_web::test]
async fn duplicate_attendance_day_conflicts() {
    let (engine, worker_id) = engine_with_worker(500.0, 50.0, 0.0).await;
    mark(&engine, worker_id, "2024-01-15", AttendanceStatus::Present, 0.0).await;

    let err = engine
        .mark_attendance(MarkAttendance {
            worker_id,
            date: d("2024-01-15"),
            status: AttendanceStatus::Half,
            ot_units: 0.0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[actix_web::test]
async fn unknown_worker_is_not_found() {
    let engine = SettlementEngine::new(MemoryStore::new());
    let err = engine.calculate_breakdown(99, None).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}
