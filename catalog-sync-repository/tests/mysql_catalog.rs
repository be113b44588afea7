//! Integration tests for the MySQL catalog store.
//!
//! These tests require a real MySQL database and use SQLx test macros
//! to ensure proper test isolation and cleanup.
//!
//! Run with: `DATABASE_URL=mysql://... cargo test --test mysql_catalog -- --ignored`

use catalog_sync_repository::{CatalogStore, CatalogStoreError, MySqlCatalogStore};
use catalog_sync_shared::NewGoods;
use sqlx::MySqlPool;

fn make_new_goods(name: &str) -> NewGoods {
    NewGoods {
        category_id: 1,
        brands_id: 1,
        on_sale: true,
        name: name.to_string(),
        shop_price: 9.9,
        market_price: 12.0,
        goods_brief: format!("{} brief", name),
        ..Default::default()
    }
}

async fn seed_references(pool: &MySqlPool) {
    sqlx::query("INSERT INTO category (id, name) VALUES (1, 'drinks')")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO brands (id, name) VALUES (1, 'acme')")
        .execute(pool)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "src/mysql/migrations")]
#[ignore = "requires a MySQL instance (DATABASE_URL)"]
async fn test_create_commit_and_get(pool: MySqlPool) {
    seed_references(&pool).await;
    let store = MySqlCatalogStore::new(pool);

    let mut tx = store.begin().await.unwrap();
    let created = tx.create_goods(&make_new_goods("green tea")).await.unwrap();
    tx.commit().await.unwrap();

    let fetched = store.get_goods(created.id).await.unwrap();
    assert_eq!(fetched, created);
    assert_eq!(store.get_all_goods_ids().await.unwrap(), vec![created.id]);
}

#[sqlx::test(migrations = "src/mysql/migrations")]
#[ignore = "requires a MySQL instance (DATABASE_URL)"]
async fn test_rollback_discards_write(pool: MySqlPool) {
    let store = MySqlCatalogStore::new(pool);

    let mut tx = store.begin().await.unwrap();
    let created = tx.create_goods(&make_new_goods("oolong")).await.unwrap();
    tx.rollback().await.unwrap();

    let result = store.get_goods(created.id).await;
    assert!(matches!(result, Err(CatalogStoreError::NotFound(_))));
}

#[sqlx::test(migrations = "src/mysql/migrations")]
#[ignore = "requires a MySQL instance (DATABASE_URL)"]
async fn test_update_and_delete(pool: MySqlPool) {
    let store = MySqlCatalogStore::new(pool);

    let mut tx = store.begin().await.unwrap();
    let mut goods = tx.create_goods(&make_new_goods("puer")).await.unwrap();
    tx.commit().await.unwrap();

    goods.shop_price = 5.5;
    goods.is_hot = true;
    let mut tx = store.begin().await.unwrap();
    tx.update_goods(&goods).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(store.get_goods(goods.id).await.unwrap(), goods);

    let mut tx = store.begin().await.unwrap();
    tx.delete_goods(goods.id).await.unwrap();
    tx.commit().await.unwrap();
    assert!(store.get_goods(goods.id).await.unwrap_err().is_not_found());
}

#[sqlx::test(migrations = "src/mysql/migrations")]
#[ignore = "requires a MySQL instance (DATABASE_URL)"]
async fn test_mutations_on_missing_rows(pool: MySqlPool) {
    let store = MySqlCatalogStore::new(pool);
    let mut tx = store.begin().await.unwrap();

    let missing = make_new_goods("ghost").into_record(4242);
    assert!(matches!(
        tx.update_goods(&missing).await,
        Err(CatalogStoreError::NotFound(4242))
    ));
    assert!(matches!(
        tx.delete_goods(4242).await,
        Err(CatalogStoreError::NotFound(4242))
    ));
}

#[sqlx::test(migrations = "src/mysql/migrations")]
#[ignore = "requires a MySQL instance (DATABASE_URL)"]
async fn test_list_by_ids_skips_missing(pool: MySqlPool) {
    let store = MySqlCatalogStore::new(pool);

    let mut tx = store.begin().await.unwrap();
    let a = tx.create_goods(&make_new_goods("a")).await.unwrap();
    let b = tx.create_goods(&make_new_goods("b")).await.unwrap();
    tx.commit().await.unwrap();

    let listed = store.list_goods_by_ids(&[b.id, 999_999, a.id]).await.unwrap();
    let ids: Vec<u64> = listed.iter().map(|g| g.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
    assert!(store.list_goods_by_ids(&[]).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "src/mysql/migrations")]
#[ignore = "requires a MySQL instance (DATABASE_URL)"]
async fn test_reference_lookups(pool: MySqlPool) {
    seed_references(&pool).await;
    let store = MySqlCatalogStore::new(pool);

    assert!(store.brand_exists(1).await.unwrap());
    assert!(!store.brand_exists(2).await.unwrap());
    assert!(store.category_exists(1).await.unwrap());
    assert!(!store.category_exists(2).await.unwrap());
}
