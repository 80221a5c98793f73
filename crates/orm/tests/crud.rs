mod common;

use common::{attrs, database, Widget};
use serde_json::json;
use storefront_orm::prelude::*;
use storefront_orm::DELETED_AT;

fn price(record: &Record<Widget>) -> Option<f64> {
    record.get("price").and_then(|v| v.as_f64())
}

#[tokio::test]
async fn test_widget_lifecycle() {
    let db = database().await;

    let widget = Widget::create(&db, attrs(json!({"name": "Widget", "price": 10.00, "sku": "W1"})))
        .await
        .unwrap();
    assert!(widget.exists());
    let id = widget.primary_key().cloned().expect("key assigned on insert");
    assert!(!id.is_null());
    assert_eq!(price(&widget), Some(10.0));

    assert!(Widget::update(&db, id.clone(), attrs(json!({"price": 12.50}))).await.unwrap());
    let found = Widget::find(&db, id.clone()).await.unwrap().unwrap();
    assert_eq!(price(&found), Some(12.5));

    assert!(Widget::delete(&db, id.clone()).await.unwrap());
    assert!(Widget::find(&db, id.clone()).await.unwrap().is_none());

    assert!(Widget::force_delete(&db, id.clone()).await.unwrap());
    assert!(Widget::find_with_trashed(&db, id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_syncs_original_with_stored_row() {
    let db = database().await;

    let mut record = Record::<Widget>::from_attributes(attrs(json!({
        "name": "Sprocket",
        "sku": "S1",
        "price": 3
    })));
    assert!(record.save(&db).await.unwrap());

    assert!(record.exists());
    assert!(!record.is_dirty());
    assert_eq!(record.original(), record.to_map());
    assert!(record.primary_key().is_some());
    assert!(record.get("created_at").and_then(|v| v.as_str()).is_some());
    assert!(record.get("updated_at").and_then(|v| v.as_str()).is_some());
    assert_eq!(record.get(DELETED_AT), Some(&serde_json::Value::Null));
    assert_eq!(price(&record), Some(3.0));
}

#[tokio::test]
async fn test_save_updates_only_dirty_attributes() {
    let db = database().await;
    let mut record = Widget::create(&db, attrs(json!({"name": "Gear", "sku": "G1", "price": 5})))
        .await
        .unwrap();

    record.set_attribute("name", "Large gear");
    assert_eq!(record.dirty().keys().collect::<Vec<_>>(), vec!["name"]);
    assert!(record.save(&db).await.unwrap());
    assert!(!record.is_dirty());

    let reloaded = Widget::find_or_fail(&db, record.primary_key().cloned().unwrap())
        .await
        .unwrap();
    assert_eq!(reloaded.get("name"), Some(&json!("Large gear")));
    assert_eq!(reloaded.get("updated_at"), record.get("updated_at"));
}

#[tokio::test]
async fn test_record_delete_and_restore() {
    let db = database().await;
    let mut record = Widget::create(&db, attrs(json!({"name": "Cog", "sku": "C1", "price": 1})))
        .await
        .unwrap();
    let id = record.primary_key().cloned().unwrap();

    assert!(record.delete(&db).await.unwrap());
    assert!(record.get(DELETED_AT).and_then(|v| v.as_str()).is_some());
    assert!(Widget::find(&db, id.clone()).await.unwrap().is_none());
    assert_eq!(Widget::query().only_trashed().count(&db).await.unwrap(), 1);

    assert!(Widget::restore(&db, id.clone()).await.unwrap());
    assert!(!Widget::restore(&db, id.clone()).await.unwrap());

    record.refresh(&db).await.unwrap();
    assert_eq!(record.get(DELETED_AT), Some(&serde_json::Value::Null));

    assert!(record.force_delete(&db).await.unwrap());
    assert!(!record.exists());
    assert_eq!(Widget::query().with_trashed().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_lookups_and_missing_rows() {
    let db = database().await;
    Widget::create(&db, attrs(json!({"name": "Nut", "sku": "N1", "price": 0.5})))
        .await
        .unwrap();
    Widget::create(&db, attrs(json!({"name": "Nut", "sku": "N2", "price": 0.75})))
        .await
        .unwrap();

    assert_eq!(Widget::find_all_by(&db, "name", "Nut").await.unwrap().len(), 2);
    let n2 = Widget::find_by(&db, "sku", "N2").await.unwrap().unwrap();
    assert_eq!(price(&n2), Some(0.75));

    assert!(Widget::find(&db, 999).await.unwrap().is_none());
    let err = Widget::find_or_fail(&db, 999).await.unwrap_err();
    assert_eq!(err, ModelError::NotFound("widgets(999)".to_string()));

    assert!(!Widget::update(&db, 999, attrs(json!({"price": 1}))).await.unwrap());
    assert!(!Widget::delete(&db, 999).await.unwrap());
}

#[tokio::test]
async fn test_mass_assignment_is_filtered_on_create_and_update() {
    let db = database().await;
    let record = Widget::create(
        &db,
        attrs(json!({"name": "Bolt", "sku": "B1", "price": 2, "id": 77, "deleted_at": "2020-01-01 00:00:00"})),
    )
    .await
    .unwrap();

    assert_ne!(record.primary_key(), Some(&json!(77)));
    assert_eq!(record.get(DELETED_AT), Some(&serde_json::Value::Null));

    let id = record.primary_key().cloned().unwrap();
    assert!(!Widget::update(&db, id, attrs(json!({"id": 5}))).await.unwrap());
}

#[tokio::test]
async fn test_query_builder_against_sqlite() {
    let db = database().await;
    for (sku, p) in [("A", 1.0), ("B", 2.0), ("C", 3.0), ("D", 4.0)] {
        Widget::create(&db, attrs(json!({"name": format!("Widget {}", sku), "sku": sku, "price": p})))
            .await
            .unwrap();
    }

    let empty: Vec<&str> = Vec::new();
    assert!(Widget::query().where_in("sku", empty.clone()).get(&db).await.unwrap().is_empty());
    assert_eq!(Widget::query().where_not_in("sku", empty).count(&db).await.unwrap(), 4);

    let cheap = Widget::query()
        .where_lte("price", 2)
        .or_where_eq("sku", "D")
        .order_by_desc("price")
        .get(&db)
        .await
        .unwrap();
    let skus: Vec<_> = cheap.iter().filter_map(|r| r.get("sku")?.as_str()).collect();
    assert_eq!(skus, vec!["D", "B", "A"]);

    let middle = Widget::query()
        .where_between("price", 2, 3)
        .select(&["sku"])
        .order_by("sku")
        .get(&db)
        .await
        .unwrap();
    assert_eq!(middle.len(), 2);
    assert_eq!(
        middle[0].to_map().keys().collect::<Vec<_>>(),
        vec!["id", "sku"]
    );
    assert!(middle[0].exists());

    let first = Widget::query().order_by("price").offset(1).first(&db).await.unwrap().unwrap();
    assert_eq!(first.get("sku"), Some(&json!("B")));

    let pattern = format!("%{}%", db.escape_like("Widget_"));
    assert_eq!(Widget::query().where_like("name", &pattern).count(&db).await.unwrap(), 0);
    assert_eq!(Widget::query().where_like("name", "Widget %").count(&db).await.unwrap(), 4);

    let err = Widget::query().where_op("price", "<=>", 1).get(&db).await.unwrap_err();
    assert!(matches!(err, ModelError::Query(_)));
}

#[tokio::test]
async fn test_typed_view_round_trip() {
    let db = database().await;
    let widget = Widget {
        id: None,
        name: "Spring".to_string(),
        sku: "SP1".to_string(),
        price: 0.25,
        created_at: None,
        updated_at: None,
        deleted_at: None,
    };

    let mut record = Record::from_model(&widget).unwrap();
    record.save(&db).await.unwrap();

    let stored: Widget = record.to_model().unwrap();
    assert!(stored.id.is_some());
    assert_eq!(stored.sku, "SP1");
    assert!(stored.created_at.is_some());
}

#[tokio::test]
async fn test_constraint_violation_surfaces_statement_error() {
    let db = database().await;
    Widget::create(&db, attrs(json!({"name": "Dup", "sku": "D1", "price": 1})))
        .await
        .unwrap();

    let err = Widget::create(&db, attrs(json!({"name": "Dup", "sku": "D1", "price": 1})))
        .await
        .unwrap_err();
    match err {
        ModelError::Statement { sql, .. } => assert!(sql.starts_with("INSERT INTO \"widgets\"")),
        other => panic!("expected statement error, got {:?}", other),
    }
    assert_eq!(db.stats().await.errors, 1);
}

#[tokio::test]
async fn test_projected_record_can_be_saved() {
    let db = database().await;
    Widget::create(&db, attrs(json!({"name": "Washer", "sku": "WA1", "price": 0.1})))
        .await
        .unwrap();

    let mut partial = Widget::query().select(&["sku"]).first(&db).await.unwrap().unwrap();
    assert!(partial.exists());
    assert!(partial.primary_key().is_some());

    partial.set_attribute("sku", "WA2");
    assert!(partial.save(&db).await.unwrap());

    let stored = Widget::find_by(&db, "sku", "WA2").await.unwrap().unwrap();
    assert_eq!(stored.get("name"), Some(&json!("Washer")));
}
