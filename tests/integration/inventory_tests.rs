//! Inventory coordinator tests against a live database

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use bookbank_server::{
    error::AppError,
    models::{
        copy::{copy_code, UpdateCopy},
        item::CreateItem,
        loan::{LoanPatch, LoanStatus, OpenLoan},
    },
};

use crate::common::{create_borrower, create_item, mint, setup, unique_tag};

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn open_request(borrower_id: i32, copy_id: i32) -> OpenLoan {
    OpenLoan {
        borrower_id: Some(borrower_id),
        copy_id: Some(copy_id),
        rules_accepted: Some(true),
        ..Default::default()
    }
}

fn close_patch() -> LoanPatch {
    LoanPatch {
        status: Some(LoanStatus::Returned),
        returned_on: Some(today()),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore]
async fn test_atlas_hand_out_and_return() {
    let (services, pool) = setup().await;

    // Codes are global; clear what earlier runs left under this prefix
    let stale: Vec<i32> = sqlx::query_scalar(
        "SELECT DISTINCT item_id FROM copies WHERE code LIKE 'GEN-ATL-%'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    for statement in [
        "DELETE FROM loans WHERE item_id = ANY($1)",
        "DELETE FROM copies WHERE item_id = ANY($1)",
        "DELETE FROM items WHERE id = ANY($1)",
    ] {
        sqlx::query(statement)
            .bind(&stale)
            .execute(&pool)
            .await
            .unwrap();
    }

    let item = services
        .catalog
        .create_item(CreateItem {
            title: "Atlas".to_string(),
            author: None,
            isbn: None,
            publisher: None,
            course: None,
            subject_id: None,
            price: None,
        })
        .await
        .unwrap();

    let copies = mint(&services, item.id, 2).await;
    let codes: Vec<_> = copies.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["GEN-ATL-001", "GEN-ATL-002"]);
    assert_eq!(services.catalog.get_item(item.id).await.unwrap().available_copies, 2);

    let borrower = create_borrower(&services).await;
    let loan = services
        .inventory
        .open_loan(open_request(borrower.id, copies[0].id))
        .await
        .unwrap();
    assert_eq!(loan.loan.copy_code.as_deref(), Some("GEN-ATL-001"));
    assert_eq!(loan.loan.due_on, loan.loan.opened_on + chrono::Duration::days(15));
    assert_eq!(services.catalog.get_item(item.id).await.unwrap().available_copies, 1);
    assert!(!services.catalog.get_copy(copies[0].id).await.unwrap().available);

    let closed = services
        .inventory
        .update_loan(loan.loan.id, close_patch())
        .await
        .unwrap();
    assert_eq!(closed.loan.status, LoanStatus::Returned);
    assert_eq!(services.catalog.get_item(item.id).await.unwrap().available_copies, 2);
    assert!(services.catalog.get_copy(copies[0].id).await.unwrap().available);

    // Closing again changes nothing
    services
        .inventory
        .update_loan(loan.loan.id, close_patch())
        .await
        .unwrap();
    assert_eq!(services.catalog.get_item(item.id).await.unwrap().available_copies, 2);

    let report = services.inventory.reconcile(Some(item.id)).await.unwrap();
    assert_eq!(report.checked, 1);
    assert!(report.repaired.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_mint_assigns_consecutive_serials() {
    let (services, _pool) = setup().await;
    let item = create_item(&services, "Matemáticas").await;

    let first = mint(&services, item.id, 3).await;
    let second = mint(&services, item.id, 2).await;

    let serials: Vec<_> = first.iter().chain(second.iter()).map(|c| c.serial).collect();
    assert_eq!(serials, vec![1, 2, 3, 4, 5]);

    for copy in first.iter().chain(second.iter()) {
        assert!(copy.available);
        assert_eq!(
            copy.code,
            copy_code(item.course.as_deref(), &item.title, copy.serial)
        );
    }

    let item = services.catalog.get_item(item.id).await.unwrap();
    assert_eq!(item.total_copies, 5);
    assert_eq!(item.available_copies, 5);

    let listed = services.catalog.copies_for_item(item.id).await.unwrap();
    assert_eq!(listed.len(), 5);
}

#[tokio::test]
#[ignore]
async fn test_mint_rejects_bad_requests() {
    let (services, _pool) = setup().await;
    let item = create_item(&services, "Lengua").await;

    let err = services.inventory.mint_copies(item.id, 0).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = services.inventory.mint_copies(item.id, 201).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = services.inventory.mint_copies(i32::MAX, 1).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = services.catalog.copies_for_item(i32::MAX).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_opens_on_one_copy() {
    let (services, _pool) = setup().await;
    let item = create_item(&services, "Historia").await;
    let copy = mint(&services, item.id, 1).await.remove(0);
    let alice = create_borrower(&services).await;
    let bob = create_borrower(&services).await;

    let (a, b) = tokio::join!(
        services.inventory.open_loan(open_request(alice.id, copy.id)),
        services.inventory.open_loan(open_request(bob.id, copy.id)),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::Conflict(_)))));

    let item = services.catalog.get_item(item.id).await.unwrap();
    assert_eq!(item.available_copies, 0);
}

#[tokio::test]
#[ignore]
async fn test_failed_open_leaves_copy_untouched() {
    let (services, _pool) = setup().await;
    let item = create_item(&services, "Biología").await;
    let copy = mint(&services, item.id, 1).await.remove(0);
    let borrower = create_borrower(&services).await;

    let err = services
        .inventory
        .open_loan(open_request(i32::MAX, copy.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let mut request = open_request(borrower.id, copy.id);
    request.item_id = Some(item.id + 1);
    let err = services.inventory.open_loan(request).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = services
        .inventory
        .open_loan(open_request(borrower.id, i32::MAX))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert!(services.catalog.get_copy(copy.id).await.unwrap().available);
    assert_eq!(services.catalog.get_item(item.id).await.unwrap().available_copies, 1);
}

#[tokio::test]
#[ignore]
async fn test_substitution_then_return() {
    let (services, _pool) = setup().await;
    let item = create_item(&services, "Química").await;
    let copies = mint(&services, item.id, 3).await;
    let borrower = create_borrower(&services).await;

    let loan = services
        .inventory
        .open_loan(open_request(borrower.id, copies[0].id))
        .await
        .unwrap();

    let substituted = services
        .inventory
        .update_loan(
            loan.loan.id,
            LoanPatch {
                substitute_copy_id: Some(copies[1].id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(substituted.loan.copy_id, copies[1].id);
    assert_eq!(substituted.loan.replaced_by, Some(copies[1].id));
    assert_eq!(substituted.loan.original_copy_id, copies[0].id);
    assert_eq!(substituted.loan.copy_code.as_deref(), Some(copies[1].code.as_str()));
    assert!(!services.catalog.get_copy(copies[0].id).await.unwrap().available);
    assert!(!services.catalog.get_copy(copies[1].id).await.unwrap().available);
    assert_eq!(services.catalog.get_item(item.id).await.unwrap().available_copies, 1);

    // Only one substitution per loan
    let err = services
        .inventory
        .update_loan(
            loan.loan.id,
            LoanPatch {
                substitute_copy_id: Some(copies[2].id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(services.catalog.get_copy(copies[2].id).await.unwrap().available);

    services
        .inventory
        .update_loan(loan.loan.id, close_patch())
        .await
        .unwrap();

    // The substitute comes back, the original stays retired
    assert!(services.catalog.get_copy(copies[1].id).await.unwrap().available);
    assert!(!services.catalog.get_copy(copies[0].id).await.unwrap().available);
    assert_eq!(services.catalog.get_item(item.id).await.unwrap().available_copies, 2);

    let report = services.inventory.reconcile(Some(item.id)).await.unwrap();
    assert!(report.repaired.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_substitute_must_be_available_copy_of_same_item() {
    let (services, _pool) = setup().await;
    let item = create_item(&services, "Física").await;
    let other = create_item(&services, "Dibujo").await;
    let copies = mint(&services, item.id, 2).await;
    let foreign = mint(&services, other.id, 1).await.remove(0);
    let borrower = create_borrower(&services).await;

    let loan = services
        .inventory
        .open_loan(open_request(borrower.id, copies[0].id))
        .await
        .unwrap();

    let substitute = |copy_id| LoanPatch {
        substitute_copy_id: Some(copy_id),
        ..Default::default()
    };

    let err = services
        .inventory
        .update_loan(loan.loan.id, substitute(foreign.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = services
        .inventory
        .update_loan(loan.loan.id, substitute(copies[0].id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = services
        .inventory
        .update_loan(loan.loan.id, substitute(i32::MAX))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Nothing was applied by the failed attempts
    let current = services.loans.get_loan(loan.loan.id).await.unwrap();
    assert_eq!(current.loan.copy_id, copies[0].id);
    assert_eq!(current.loan.replaced_by, None);
}

#[tokio::test]
#[ignore]
async fn test_return_fields_merge_onto_previously_live_copy() {
    let (services, _pool) = setup().await;
    let item = create_item(&services, "Geografía").await;
    let copies = mint(&services, item.id, 2).await;
    let borrower = create_borrower(&services).await;

    let loan = services
        .inventory
        .open_loan(open_request(borrower.id, copies[0].id))
        .await
        .unwrap();

    let patch: LoanPatch = serde_json::from_value(serde_json::json!({
        "substitute_copy_id": copies[1].id,
        "return_notes": "Portada rota",
        "return_rating": "Sustituir",
    }))
    .unwrap();
    let updated = services.inventory.update_loan(loan.loan.id, patch).await.unwrap();
    assert_eq!(updated.loan.return_notes.as_deref(), Some("Portada rota"));

    let original = services.catalog.get_copy(copies[0].id).await.unwrap();
    assert_eq!(original.notes.as_deref(), Some("Portada rota"));
    assert_eq!(original.return_rating.as_deref(), Some("Sustituir"));

    let substitute = services.catalog.get_copy(copies[1].id).await.unwrap();
    assert_eq!(substitute.notes, None);
    assert_eq!(substitute.return_rating, None);
}

#[tokio::test]
#[ignore]
async fn test_return_stamps_condition_on_copy() {
    let (services, _pool) = setup().await;
    let item = create_item(&services, "Inglés").await;
    let copy = mint(&services, item.id, 1).await.remove(0);
    let borrower = create_borrower(&services).await;

    let mut request = open_request(borrower.id, copy.id);
    request.handout_condition = Some([("Cubierta", "Bueno")].into_iter().collect());
    request.handout_rating = Some("Bueno".to_string());
    let loan = services.inventory.open_loan(request).await.unwrap();

    let handed_out = services.catalog.get_copy(copy.id).await.unwrap();
    assert_eq!(handed_out.handout_condition.get("Cubierta"), Some("Bueno"));
    assert_eq!(handed_out.handout_rating.as_deref(), Some("Bueno"));

    let mut patch = close_patch();
    patch.return_condition = Some([("Cubierta", "Revisar")].into_iter().collect());
    patch.return_rating = Some(Some("Revisar".to_string()));
    services.inventory.update_loan(loan.loan.id, patch).await.unwrap();

    let returned = services.catalog.get_copy(copy.id).await.unwrap();
    assert!(returned.available);
    assert_eq!(returned.return_condition.get("Cubierta"), Some("Revisar"));
    assert_eq!(returned.return_rating.as_deref(), Some("Revisar"));
    assert_eq!(returned.handout_condition.get("Cubierta"), Some("Bueno"));
}

#[tokio::test]
#[ignore]
async fn test_invalid_transitions_are_rejected() {
    let (services, _pool) = setup().await;
    let item = create_item(&services, "Música").await;
    let copy = mint(&services, item.id, 1).await.remove(0);
    let borrower = create_borrower(&services).await;

    let loan = services
        .inventory
        .open_loan(open_request(borrower.id, copy.id))
        .await
        .unwrap();
    let id = loan.loan.id;

    let err = services
        .inventory
        .update_loan(id, LoanPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = services
        .inventory
        .update_loan(
            id,
            LoanPatch {
                status: Some(LoanStatus::Returned),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = services
        .inventory
        .update_loan(
            id,
            LoanPatch {
                return_condition: Some([("Lomo", "Roto")].into_iter().collect()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    services.inventory.update_loan(id, close_patch()).await.unwrap();

    let err = services
        .inventory
        .update_loan(
            id,
            LoanPatch {
                status: Some(LoanStatus::Active),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = services.inventory.update_loan(i32::MAX, close_patch()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Payment can still be recorded after the return
    let paid = services
        .inventory
        .update_loan(
            id,
            LoanPatch {
                paid: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(paid.loan.paid);
    assert_eq!(services.catalog.get_item(item.id).await.unwrap().available_copies, 1);
}

#[tokio::test]
#[ignore]
async fn test_retire_and_restore_copy() {
    let (services, _pool) = setup().await;
    let item = create_item(&services, "Filosofía").await;
    let copies = mint(&services, item.id, 2).await;
    let borrower = create_borrower(&services).await;

    let retired = services
        .inventory
        .update_copy(
            copies[0].id,
            UpdateCopy {
                available: Some(false),
                notes: Some("Mojado".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!retired.available);
    assert_eq!(retired.notes.as_deref(), Some("Mojado"));
    assert_eq!(services.catalog.get_item(item.id).await.unwrap().available_copies, 1);

    services
        .inventory
        .update_copy(
            copies[0].id,
            UpdateCopy {
                available: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(services.catalog.get_item(item.id).await.unwrap().available_copies, 2);

    services
        .inventory
        .open_loan(open_request(borrower.id, copies[1].id))
        .await
        .unwrap();
    let err = services
        .inventory
        .update_copy(
            copies[1].id,
            UpdateCopy {
                available: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = services
        .inventory
        .update_copy(copies[1].id, UpdateCopy::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
#[ignore]
async fn test_reconcile_repairs_drift() {
    let (services, pool) = setup().await;
    let item = create_item(&services, "Economía").await;
    mint(&services, item.id, 2).await;

    sqlx::query("UPDATE items SET total_copies = 7, available_copies = 0 WHERE id = $1")
        .bind(item.id)
        .execute(&pool)
        .await
        .unwrap();

    let report = services.inventory.reconcile(Some(item.id)).await.unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.repaired.len(), 1);
    let drift = &report.repaired[0];
    assert_eq!((drift.stored_total, drift.counted_total), (7, 2));
    assert_eq!((drift.stored_available, drift.counted_available), (0, 2));

    let item = services.catalog.get_item(item.id).await.unwrap();
    assert_eq!((item.total_copies, item.available_copies), (2, 2));

    let report = services.inventory.reconcile(Some(item.id)).await.unwrap();
    assert!(report.repaired.is_empty());

    let err = services.inventory.reconcile(Some(i32::MAX)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[ignore]
async fn test_item_with_copies_cannot_be_deleted() {
    let (services, _pool) = setup().await;
    let empty = create_item(&services, "Latín").await;
    services.catalog.delete_item(empty.id).await.unwrap();
    assert!(matches!(
        services.catalog.get_item(empty.id).await,
        Err(AppError::NotFound(_))
    ));

    let stocked = create_item(&services, "Griego").await;
    mint(&services, stocked.id, 1).await;
    let err = services.catalog.delete_item(stocked.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_delete_racing_mint_ends_in_conflict_or_not_found() {
    let (services, _pool) = setup().await;

    for _ in 0..10 {
        let item = create_item(&services, "Dibujo").await;
        let (minted, deleted) = tokio::join!(
            services.inventory.mint_copies(item.id, 2),
            services.catalog.delete_item(item.id),
        );

        match (minted, deleted) {
            (Ok(copies), Err(AppError::Conflict(_))) => assert_eq!(copies.len(), 2),
            (Err(AppError::NotFound(_)), Ok(())) => {}
            other => panic!("unexpected mint/delete outcome: {:?}", other),
        }
    }
}

#[tokio::test]
#[ignore]
async fn test_mint_skips_codes_taken_by_another_item() {
    let (services, _pool) = setup().await;
    let course = format!("M{}", unique_tag());

    let mut items = Vec::new();
    for title in ["Matemáticas I", "Matemáticas II"] {
        let item = services
            .catalog
            .create_item(CreateItem {
                title: title.to_string(),
                author: None,
                isbn: None,
                publisher: None,
                course: Some(course.clone()),
                subject_id: None,
                price: None,
            })
            .await
            .unwrap();
        items.push(item);
    }

    let first = mint(&services, items[0].id, 120).await;
    assert_eq!(first.last().map(|c| c.serial), Some(120));

    let second = mint(&services, items[1].id, 3).await;
    let serials: Vec<_> = second.iter().map(|c| c.serial).collect();
    assert_eq!(serials, vec![121, 122, 123]);

    let taken: HashSet<_> = first.iter().map(|c| c.code.as_str()).collect();
    assert!(second.iter().all(|c| !taken.contains(c.code.as_str())));

    let more = mint(&services, items[1].id, 2).await;
    let serials: Vec<_> = more.iter().map(|c| c.serial).collect();
    assert_eq!(serials, vec![124, 125]);

    let item = services.catalog.get_item(items[1].id).await.unwrap();
    assert_eq!((item.total_copies, item.available_copies), (5, 5));
}

/// Replay a failing run by setting `BOOKBANK_TEST_SEED`
fn sequence_seed() -> u64 {
    std::env::var("BOOKBANK_TEST_SEED")
        .ok()
        .and_then(|seed| seed.parse().ok())
        .unwrap_or(20_250_915)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_random_sequence_keeps_availability_and_counters_consistent() {
    let (services, pool) = setup().await;
    let seed = sequence_seed();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut item_ids = Vec::new();
    let mut copies = Vec::new();
    for title in ["Tecnología", "Música"] {
        let item = create_item(&services, title).await;
        item_ids.push(item.id);
        copies.extend(mint(&services, item.id, 4).await);
    }
    let mut borrowers = Vec::new();
    for _ in 0..4 {
        borrowers.push(create_borrower(&services).await.id);
    }

    // (loan id, item id) of loans still open
    let mut active: Vec<(i32, i32)> = Vec::new();
    // Copies taken off the shelf by hand or swapped out of a loan
    let mut retired: HashSet<i32> = HashSet::new();

    for step in 0..150 {
        let copy = copies.choose(&mut rng).unwrap().clone();
        let borrower = *borrowers.choose(&mut rng).unwrap();

        match rng.gen_range(0..6) {
            0 | 1 => match services
                .inventory
                .open_loan(open_request(borrower, copy.id))
                .await
            {
                Ok(loan) => active.push((loan.loan.id, copy.item_id)),
                Err(AppError::Conflict(_)) => {}
                Err(e) => panic!("seed {} step {}: open failed: {:?}", seed, step, e),
            },
            2 => {
                let other = *borrowers.choose(&mut rng).unwrap();
                let was_available = services.catalog.get_copy(copy.id).await.unwrap().available;
                let (a, b) = tokio::join!(
                    services.inventory.open_loan(open_request(borrower, copy.id)),
                    services.inventory.open_loan(open_request(other, copy.id)),
                );

                let mut opened = 0;
                for result in [a, b] {
                    match result {
                        Ok(loan) => {
                            opened += 1;
                            active.push((loan.loan.id, copy.item_id));
                        }
                        Err(AppError::Conflict(_)) => {}
                        Err(e) => panic!("seed {} step {}: open failed: {:?}", seed, step, e),
                    }
                }
                assert_eq!(
                    opened,
                    usize::from(was_available),
                    "seed {} step {}: concurrent opens on copy {}",
                    seed,
                    step,
                    copy.id
                );
            }
            3 if !active.is_empty() => {
                let (loan_id, _) = active.swap_remove(rng.gen_range(0..active.len()));
                if let Err(e) = services.inventory.update_loan(loan_id, close_patch()).await {
                    panic!("seed {} step {}: close failed: {:?}", seed, step, e);
                }
            }
            4 if !active.is_empty() => {
                let (loan_id, item_id) = active[rng.gen_range(0..active.len())];
                let candidates: Vec<i32> = copies
                    .iter()
                    .filter(|c| c.item_id == item_id)
                    .map(|c| c.id)
                    .collect();
                let substitute = *candidates.choose(&mut rng).unwrap();
                let live = services.loans.get_loan(loan_id).await.unwrap().loan.copy_id;

                match services
                    .inventory
                    .update_loan(
                        loan_id,
                        LoanPatch {
                            substitute_copy_id: Some(substitute),
                            ..Default::default()
                        },
                    )
                    .await
                {
                    Ok(_) => {
                        retired.insert(live);
                    }
                    Err(AppError::Conflict(_)) | Err(AppError::BadRequest(_)) => {}
                    Err(e) => panic!("seed {} step {}: substitute failed: {:?}", seed, step, e),
                }
            }
            5 => {
                let restore = retired.contains(&copy.id) && rng.gen_bool(0.5);
                let was_available = services.catalog.get_copy(copy.id).await.unwrap().available;
                let result = services
                    .inventory
                    .update_copy(
                        copy.id,
                        UpdateCopy {
                            available: Some(restore),
                            ..Default::default()
                        },
                    )
                    .await;
                if let Err(e) = result {
                    panic!("seed {} step {}: availability change failed: {:?}", seed, step, e);
                }
                if restore {
                    retired.remove(&copy.id);
                } else if was_available {
                    retired.insert(copy.id);
                }
            }
            _ => {}
        }
    }

    // Every copy of these items: unavailable exactly when live on one active loan or retired
    let live_counts: HashMap<i32, i64> = sqlx::query_as::<_, (i32, i64)>(
        "SELECT copy_id, COUNT(*) FROM loans WHERE status = 'active' AND item_id = ANY($1) GROUP BY copy_id",
    )
    .bind(&item_ids)
    .fetch_all(&pool)
    .await
    .unwrap()
    .into_iter()
    .collect();
    assert_eq!(live_counts.values().sum::<i64>(), active.len() as i64, "seed {}", seed);

    for item_id in &item_ids {
        let item = services.catalog.get_item(*item_id).await.unwrap();
        let stored = services.catalog.copies_for_item(*item_id).await.unwrap();
        for copy in &stored {
            let live = live_counts.get(&copy.id).copied().unwrap_or(0);
            assert!(live <= 1, "seed {}: copy {} on {} active loans", seed, copy.code, live);
            assert_eq!(
                !copy.available,
                live == 1 || retired.contains(&copy.id),
                "seed {}: copy {} availability",
                seed,
                copy.code
            );
            assert!(!(live == 1 && retired.contains(&copy.id)), "seed {}", seed);
        }
        let shelved = stored.iter().filter(|c| c.available).count() as i32;
        assert_eq!(item.available_copies, shelved, "seed {}: item {}", seed, item_id);
        assert_eq!(item.total_copies, stored.len() as i32, "seed {}: item {}", seed, item_id);
    }

    // Whole tables
    let shelved_on_loan: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM copies c JOIN loans l ON l.copy_id = c.id WHERE l.status = 'active' AND c.available",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(shelved_on_loan, 0);

    let doubly_lent: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM (SELECT copy_id FROM loans WHERE status = 'active' GROUP BY copy_id HAVING COUNT(*) > 1) d",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(doubly_lent, 0);

    // Other tests inject counter drift on purpose; only these items must be clean
    let report = services.inventory.reconcile(None).await.unwrap();
    assert!(report.checked >= item_ids.len());
    assert!(
        report.repaired.iter().all(|d| !item_ids.contains(&d.item_id)),
        "seed {}: drift {:?}",
        seed,
        report.repaired
    );
}
