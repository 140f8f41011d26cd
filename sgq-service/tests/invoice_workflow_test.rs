//! Invoice lifecycle and stock reconciliation against the in-memory datastore.

mod common;

use chrono::NaiveDate;
use common::{memory_state, seed_client, seed_product, seed_service, stock_of};
use rust_decimal::Decimal;
use sgq_service::middleware::OperatorContext;
use sgq_service::models::{AccessLevel, InvoiceDraft, InvoiceStatus, ItemKind, LineItem};
use sgq_service::services::{InvoiceError, LineItemComposer};
use sgq_service::store::{ListQuery, Repository};

fn operator() -> OperatorContext {
    OperatorContext::new("emp-1", AccessLevel::Admin)
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
}

fn product_item(id: &str, quantity: i64, price: i64) -> LineItem {
    LineItem {
        kind: ItemKind::Product,
        catalog_id: id.to_string(),
        name: format!("Produto {}", id),
        quantity,
        unit_price: Decimal::from(price),
    }
}

fn service_item(id: &str, quantity: i64, price: i64) -> LineItem {
    LineItem {
        kind: ItemKind::Service,
        catalog_id: id.to_string(),
        name: format!("Serviço {}", id),
        quantity,
        unit_price: Decimal::from(price),
    }
}

fn draft(client_id: &str, delivery: NaiveDate, items: Vec<LineItem>) -> InvoiceDraft {
    let total = sgq_service::models::total_of(&items).unwrap_or_default();
    InvoiceDraft {
        client_id: client_id.to_string(),
        delivery_date: delivery,
        status: InvoiceStatus::Proforma,
        items,
        total,
    }
}

async fn invoice_count(state: &sgq_service::startup::AppState) -> u64 {
    state
        .repos
        .invoices
        .list(&ListQuery::default())
        .await
        .unwrap()
        .total
}

#[tokio::test]
async fn creating_an_invoice_decrements_stock() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana Silva").await;
    seed_product(&state.repos, "P1", "Bolo", 10, 1000).await;

    let invoice = state
        .invoices
        .create(
            InvoiceDraft {
                client_id: "C1".to_string(),
                delivery_date: date(10),
                status: InvoiceStatus::default(),
                items: vec![product_item("P1", 3, 1000)],
                total: Decimal::from(3000),
            },
            &operator(),
        )
        .await
        .expect("Failed to create invoice");

    assert_eq!(stock_of(&state.repos, "P1").await, 7);
    assert_eq!(invoice.client_name, "Ana Silva");
    assert_eq!(invoice.status, InvoiceStatus::Proforma);
    assert_eq!(invoice.operator_id.as_deref(), Some("emp-1"));

    let page = state.invoices.list(&ListQuery::paged(1, 10)).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].total, Decimal::from(3000));
    assert_eq!(page.items[0].id, invoice.id);
}

#[tokio::test]
async fn missing_product_rolls_back_everything() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana").await;
    seed_product(&state.repos, "P1", "Bolo", 10, 1000).await;

    let result = state
        .invoices
        .create(
            draft(
                "C1",
                date(10),
                vec![product_item("P1", 2, 1000), product_item("BOGUS", 1, 500)],
            ),
            &operator(),
        )
        .await;

    assert!(matches!(result, Err(InvoiceError::ProductNotFound(id)) if id == "BOGUS"));
    assert_eq!(invoice_count(&state).await, 0);
    assert_eq!(stock_of(&state.repos, "P1").await, 10);
}

#[tokio::test]
async fn new_invoices_cannot_start_as_paid() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana").await;
    seed_product(&state.repos, "P1", "Bolo", 10, 1000).await;

    let mut paid = draft("C1", date(10), vec![product_item("P1", 1, 1000)]);
    paid.status = InvoiceStatus::Paid;
    let result = state.invoices.create(paid, &operator()).await;

    assert!(matches!(result, Err(InvoiceError::Validation(_))));
    assert_eq!(invoice_count(&state).await, 0);
    assert_eq!(stock_of(&state.repos, "P1").await, 10);
}

#[tokio::test]
async fn oversized_amounts_are_rejected_without_panicking() {
    let state = memory_state(|config| config.inventory.allow_negative_stock = true);
    seed_client(&state.repos, "C1", "Ana").await;
    seed_product(&state.repos, "P1", "Bolo", 10, 1000).await;

    let mut oversized = draft("C1", date(10), vec![product_item("P1", i64::MAX, 1)]);
    oversized.items[0].unit_price = Decimal::from(10_000_000_000i64);
    oversized.total = Decimal::ZERO;
    let result = state.invoices.create(oversized, &operator()).await;

    assert!(matches!(result, Err(InvoiceError::Validation(message)) if message.contains("too large")));
    assert_eq!(invoice_count(&state).await, 0);
    assert_eq!(stock_of(&state.repos, "P1").await, 10);
}

#[tokio::test]
async fn service_items_do_not_touch_stock() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana").await;
    seed_product(&state.repos, "P1", "Bolo", 10, 1000).await;
    seed_service(&state.repos, "S1", "Entrega", 1500).await;

    state
        .invoices
        .create(
            draft("C1", date(10), vec![service_item("S1", 2, 1500)]),
            &operator(),
        )
        .await
        .expect("Failed to create invoice");

    assert_eq!(invoice_count(&state).await, 1);
    assert_eq!(stock_of(&state.repos, "P1").await, 10);
}

#[tokio::test]
async fn service_item_sharing_a_product_id_is_still_skipped() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana").await;
    seed_product(&state.repos, "X1", "Bolo", 4, 1000).await;

    state
        .invoices
        .create(draft("C1", date(10), vec![service_item("X1", 9, 10)]), &operator())
        .await
        .expect("Failed to create invoice");

    assert_eq!(stock_of(&state.repos, "X1").await, 4);
}

#[tokio::test]
async fn insufficient_stock_is_rejected_by_default() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana").await;
    seed_product(&state.repos, "P1", "Bolo", 2, 1000).await;

    let result = state
        .invoices
        .create(draft("C1", date(10), vec![product_item("P1", 3, 1000)]), &operator())
        .await;

    assert!(matches!(
        result,
        Err(InvoiceError::InsufficientStock {
            requested: 3,
            available: 2,
            ..
        })
    ));
    assert_eq!(invoice_count(&state).await, 0);
    assert_eq!(stock_of(&state.repos, "P1").await, 2);
}

#[tokio::test]
async fn negative_stock_can_be_allowed() {
    let state = memory_state(|config| config.inventory.allow_negative_stock = true);
    seed_client(&state.repos, "C1", "Ana").await;
    seed_product(&state.repos, "P1", "Bolo", 2, 1000).await;

    state
        .invoices
        .create(draft("C1", date(10), vec![product_item("P1", 3, 1000)]), &operator())
        .await
        .expect("Failed to create invoice");

    assert_eq!(stock_of(&state.repos, "P1").await, -1);
}

#[tokio::test]
async fn repeated_product_lines_decrement_cumulatively() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana").await;
    seed_product(&state.repos, "P1", "Bolo", 5, 100).await;

    let result = state
        .invoices
        .create(
            draft(
                "C1",
                date(10),
                vec![product_item("P1", 3, 100), product_item("P1", 3, 100)],
            ),
            &operator(),
        )
        .await;

    assert!(matches!(result, Err(InvoiceError::InsufficientStock { .. })));
    assert_eq!(stock_of(&state.repos, "P1").await, 5);
}

#[tokio::test]
async fn invalid_drafts_are_rejected_without_writes() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana").await;
    seed_product(&state.repos, "P1", "Bolo", 10, 1000).await;

    let mut wrong_total = draft("C1", date(10), vec![product_item("P1", 3, 1000)]);
    wrong_total.total = Decimal::from(2500);
    let result = state.invoices.create(wrong_total, &operator()).await;
    assert!(matches!(result, Err(InvoiceError::Validation(_))));

    let mut negative_total = draft("C1", date(10), vec![product_item("P1", 1, 0)]);
    negative_total.total = Decimal::from(-1);
    let result = state.invoices.create(negative_total, &operator()).await;
    assert!(matches!(result, Err(InvoiceError::Validation(_))));

    let zero_quantity = draft("C1", date(10), vec![product_item("P1", 0, 1000)]);
    let result = state.invoices.create(zero_quantity, &operator()).await;
    assert!(matches!(result, Err(InvoiceError::Validation(_))));

    let no_items = draft("C1", date(10), vec![]);
    let result = state.invoices.create(no_items, &operator()).await;
    assert!(matches!(result, Err(InvoiceError::Validation(_))));

    let unknown_client = draft("C9", date(10), vec![product_item("P1", 1, 1000)]);
    let result = state.invoices.create(unknown_client, &operator()).await;
    assert!(matches!(result, Err(InvoiceError::ClientNotFound(_))));

    assert_eq!(invoice_count(&state).await, 0);
    assert_eq!(stock_of(&state.repos, "P1").await, 10);
}

#[tokio::test]
async fn composer_output_is_accepted() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana").await;
    let bolo = seed_product(&state.repos, "P1", "Bolo", 10, 1000).await;
    let entrega = seed_service(&state.repos, "S1", "Entrega", 500).await;

    let mut composer = LineItemComposer::new();
    let first = composer.add_line_item();
    composer.select_catalog_entry(first, &bolo).unwrap();
    composer.update_quantity(first, 2).unwrap();
    let second = composer.add_line_item();
    composer.select_catalog_entry(second, &entrega).unwrap();
    assert_eq!(composer.compute_total(), Ok(Decimal::from(2500)));

    let draft = composer
        .into_draft("C1", date(12), InvoiceStatus::Invoice)
        .unwrap();
    let invoice = state.invoices.create(draft, &operator()).await.unwrap();

    assert_eq!(invoice.total, Decimal::from(2500));
    assert_eq!(invoice.status, InvoiceStatus::Invoice);
    assert_eq!(stock_of(&state.repos, "P1").await, 8);
}

#[tokio::test]
async fn editing_does_not_adjust_stock_by_default() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana").await;
    seed_client(&state.repos, "C2", "Bruno").await;
    seed_product(&state.repos, "P1", "Bolo", 10, 1000).await;

    let invoice = state
        .invoices
        .create(draft("C1", date(10), vec![product_item("P1", 3, 1000)]), &operator())
        .await
        .unwrap();

    let mut edit = draft("C2", date(11), vec![product_item("P1", 5, 1000)]);
    edit.status = InvoiceStatus::Paid;
    let updated = state
        .invoices
        .update(&invoice.id, edit, &operator())
        .await
        .unwrap();

    assert_eq!(updated.id, invoice.id);
    assert_eq!(updated.client_name, "Bruno");
    assert_eq!(updated.status, InvoiceStatus::Paid);
    assert_eq!(updated.total, Decimal::from(5000));
    assert_eq!(updated.created_at, invoice.created_at);
    assert_eq!(stock_of(&state.repos, "P1").await, 7);

    let stored = state.invoices.get(&invoice.id).await.unwrap();
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn editing_can_reconcile_stock() {
    let state = memory_state(|config| config.inventory.adjust_stock_on_edit = true);
    seed_client(&state.repos, "C1", "Ana").await;
    seed_product(&state.repos, "P1", "Bolo", 10, 1000).await;
    seed_product(&state.repos, "P2", "Pão", 10, 100).await;

    let invoice = state
        .invoices
        .create(
            draft(
                "C1",
                date(10),
                vec![product_item("P1", 3, 1000), product_item("P2", 4, 100)],
            ),
            &operator(),
        )
        .await
        .unwrap();
    assert_eq!(stock_of(&state.repos, "P1").await, 7);
    assert_eq!(stock_of(&state.repos, "P2").await, 6);

    state
        .invoices
        .update(
            &invoice.id,
            draft("C1", date(10), vec![product_item("P1", 5, 1000)]),
            &operator(),
        )
        .await
        .unwrap();

    assert_eq!(stock_of(&state.repos, "P1").await, 5);
    assert_eq!(stock_of(&state.repos, "P2").await, 10);
}

#[tokio::test]
async fn failed_edit_leaves_invoice_and_stock_unchanged() {
    let state = memory_state(|config| config.inventory.adjust_stock_on_edit = true);
    seed_client(&state.repos, "C1", "Ana").await;
    seed_product(&state.repos, "P1", "Bolo", 5, 1000).await;

    let invoice = state
        .invoices
        .create(draft("C1", date(10), vec![product_item("P1", 3, 1000)]), &operator())
        .await
        .unwrap();

    let result = state
        .invoices
        .update(
            &invoice.id,
            draft("C1", date(10), vec![product_item("P1", 9, 1000)]),
            &operator(),
        )
        .await;

    assert!(matches!(result, Err(InvoiceError::InsufficientStock { .. })));
    assert_eq!(state.invoices.get(&invoice.id).await.unwrap(), invoice);
    assert_eq!(stock_of(&state.repos, "P1").await, 2);
}

#[tokio::test]
async fn deleting_keeps_stock_by_default() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana").await;
    seed_product(&state.repos, "P1", "Bolo", 10, 1000).await;

    let invoice = state
        .invoices
        .create(draft("C1", date(10), vec![product_item("P1", 3, 1000)]), &operator())
        .await
        .unwrap();

    state.invoices.delete(&invoice.id, &operator()).await.unwrap();

    assert_eq!(invoice_count(&state).await, 0);
    assert_eq!(stock_of(&state.repos, "P1").await, 7);
    assert!(matches!(
        state.invoices.delete(&invoice.id, &operator()).await,
        Err(InvoiceError::InvoiceNotFound(_))
    ));
}

#[tokio::test]
async fn deleting_can_restore_stock() {
    let state = memory_state(|config| config.inventory.restore_stock_on_delete = true);
    seed_client(&state.repos, "C1", "Ana").await;
    seed_product(&state.repos, "P1", "Bolo", 10, 1000).await;
    seed_product(&state.repos, "P2", "Pão", 10, 100).await;

    let invoice = state
        .invoices
        .create(
            draft(
                "C1",
                date(10),
                vec![product_item("P1", 3, 1000), product_item("P2", 1, 100)],
            ),
            &operator(),
        )
        .await
        .unwrap();

    // a product removed from the catalog meanwhile is skipped
    state.repos.products.delete("P2").await.unwrap();

    state.invoices.delete(&invoice.id, &operator()).await.unwrap();
    assert_eq!(stock_of(&state.repos, "P1").await, 10);
    assert_eq!(invoice_count(&state).await, 0);
}

#[tokio::test]
async fn status_may_move_freely_unless_forward_only() {
    let free = memory_state(|_| {});
    seed_client(&free.repos, "C1", "Ana").await;
    seed_service(&free.repos, "S1", "Entrega", 100).await;

    let invoice = free
        .invoices
        .create(draft("C1", date(10), vec![service_item("S1", 1, 100)]), &operator())
        .await
        .unwrap();
    let mut paid = draft("C1", date(10), vec![service_item("S1", 1, 100)]);
    paid.status = InvoiceStatus::Paid;
    let moved = free
        .invoices
        .update(&invoice.id, paid, &operator())
        .await
        .unwrap();
    assert_eq!(moved.status, InvoiceStatus::Paid);
    let back = free
        .invoices
        .update(
            &invoice.id,
            draft("C1", date(10), vec![service_item("S1", 1, 100)]),
            &operator(),
        )
        .await
        .unwrap();
    assert_eq!(back.status, InvoiceStatus::Proforma);

    let strict = memory_state(|config| config.invoicing.enforce_forward_status = true);
    seed_client(&strict.repos, "C1", "Ana").await;

    let invoice = strict
        .invoices
        .create(draft("C1", date(10), vec![service_item("S1", 1, 100)]), &operator())
        .await
        .unwrap();

    let mut forward = draft("C1", date(10), vec![service_item("S1", 1, 100)]);
    forward.status = InvoiceStatus::Invoice;
    let moved = strict
        .invoices
        .update(&invoice.id, forward, &operator())
        .await
        .unwrap();
    assert_eq!(moved.status, InvoiceStatus::Invoice);

    let result = strict
        .invoices
        .update(
            &invoice.id,
            draft("C1", date(10), vec![service_item("S1", 1, 100)]),
            &operator(),
        )
        .await;
    assert!(matches!(
        result,
        Err(InvoiceError::InvalidTransition {
            from: InvoiceStatus::Invoice,
            to: InvoiceStatus::Proforma
        })
    ));
}

#[tokio::test]
async fn listing_pages_newest_first() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana").await;
    seed_service(&state.repos, "S1", "Entrega", 100).await;

    let mut created = Vec::new();
    for day in 1..=25 {
        let invoice = state
            .invoices
            .create(draft("C1", date(day), vec![service_item("S1", 1, 100)]), &operator())
            .await
            .unwrap();
        created.push(invoice);
    }
    created.sort_by(|a, b| b.delivery_date.cmp(&a.delivery_date));

    let page = state.invoices.list(&ListQuery::paged(2, 10)).await.unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.total_pages(), 3);
    let expected: Vec<&str> = created[10..20].iter().map(|i| i.id.as_str()).collect();
    let actual: Vec<&str> = page.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(actual, expected);

    let last = state.invoices.list(&ListQuery::paged(3, 10)).await.unwrap();
    assert_eq!(last.items.len(), 5);

    let beyond = state.invoices.list(&ListQuery::paged(4, 10)).await.unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 25);
}

#[tokio::test]
async fn repeated_listing_is_stable() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana").await;
    seed_service(&state.repos, "S1", "Entrega", 100).await;

    // several invoices on the same date so ordering relies on the id tiebreak
    for _ in 0..6 {
        state
            .invoices
            .create(draft("C1", date(10), vec![service_item("S1", 1, 100)]), &operator())
            .await
            .unwrap();
    }

    let query = ListQuery::paged(1, 4).with_search(Some("ana".to_string()));
    let first = state.invoices.list(&query).await.unwrap();
    let second = state.invoices.list(&query).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn listing_filters_by_search_and_date_range() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana Silva").await;
    seed_client(&state.repos, "C2", "Bruno Costa").await;
    seed_product(&state.repos, "P1", "Bolo de chocolate", 100, 1000).await;
    seed_service(&state.repos, "S1", "Entrega", 100).await;

    let mut chocolate = product_item("P1", 1, 1000);
    chocolate.name = "Bolo de chocolate".to_string();

    state
        .invoices
        .create(draft("C1", date(3), vec![service_item("S1", 1, 100)]), &operator())
        .await
        .unwrap();
    state
        .invoices
        .create(draft("C2", date(15), vec![chocolate]), &operator())
        .await
        .unwrap();
    state
        .invoices
        .create(draft("C2", date(28), vec![service_item("S1", 1, 100)]), &operator())
        .await
        .unwrap();

    let by_client = ListQuery::default().with_search(Some("SILVA".to_string()));
    assert_eq!(state.invoices.list(&by_client).await.unwrap().total, 1);

    let by_item = ListQuery::default().with_search(Some("chocolate".to_string()));
    let found = state.invoices.list(&by_item).await.unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].delivery_date, date(15));

    let params = sgq_service::dtos::ListParams {
        start_date: Some(date(3)),
        end_date: Some(date(15)),
        ..Default::default()
    };
    let in_range = params
        .into_query::<sgq_service::models::Invoice>(&state.config.pagination)
        .unwrap();
    let ranged = state.invoices.list(&in_range).await.unwrap();
    let dates: Vec<NaiveDate> = ranged.items.iter().map(|i| i.delivery_date).collect();
    assert_eq!(dates, vec![date(15), date(3)]);
}

#[tokio::test]
async fn upcoming_pickups_are_sorted_and_skip_missing_clients() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana").await;
    seed_client(&state.repos, "C2", "Bruno").await;
    seed_service(&state.repos, "S1", "Entrega", 100).await;

    for (client, day) in [("C1", 12), ("C2", 10), ("C1", 13), ("C2", 9), ("C1", 11)] {
        state
            .invoices
            .create(draft(client, date(day), vec![service_item("S1", 1, 100)]), &operator())
            .await
            .unwrap();
    }
    state.repos.clients.delete("C2").await.unwrap();

    let pickups = state.invoices.upcoming_pickups(date(10)).await.unwrap();

    // window covers days 10 to 12; day 10 belongs to a deleted client
    let days: Vec<i64> = pickups.iter().map(|p| p.days_until_pickup).collect();
    assert_eq!(days, vec![1, 2]);
    assert!(pickups.iter().all(|p| p.client_name == "Ana"));
    assert_eq!(pickups[0].invoice.delivery_date, date(11));
    assert!(pickups[0].client_phone.is_some());
}

#[tokio::test]
async fn export_and_form_data() {
    let state = memory_state(|_| {});
    seed_client(&state.repos, "C1", "Ana").await;
    seed_product(&state.repos, "P1", "Bolo", 10, 1000).await;
    seed_service(&state.repos, "S1", "Entrega", 100).await;

    let invoice = state
        .invoices
        .create(draft("C1", date(10), vec![product_item("P1", 1, 1000)]), &operator())
        .await
        .unwrap();

    let document = state.invoices.export(&invoice.id).await.unwrap();
    assert_eq!(document.invoice, invoice);
    assert_eq!(document.client.map(|c| c.name), Some("Ana".to_string()));
    assert_eq!(document.company.id, "empresa");

    let form = state.invoices.form_data().await.unwrap();
    assert_eq!(form.clients.len(), 1);
    assert_eq!(form.products.len(), 1);
    assert_eq!(form.products[0].quantity, 9);
    assert_eq!(form.services.len(), 1);

    assert!(matches!(
        state.invoices.export("missing").await,
        Err(InvoiceError::InvoiceNotFound(_))
    ));
}
