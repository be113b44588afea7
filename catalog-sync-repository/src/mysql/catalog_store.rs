use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::{MySql, QueryBuilder, Transaction};
use tracing::{debug, info};

use crate::errors::CatalogStoreError;
use crate::interfaces::{CatalogStore, CatalogTransaction};
use catalog_sync_shared::{GoodsRecord, NewGoods};

const GOODS_COLUMNS: &str = "id, category_id, brands_id, on_sale, ship_free, is_new, is_hot, \
     goods_sn, name, click_num, sold_num, fav_num, market_price, shop_price, \
     goods_brief, goods_desc, goods_front_image";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(sqlx::FromRow)]
struct GoodsRow {
    id: u64,
    category_id: i32,
    brands_id: i32,
    on_sale: bool,
    ship_free: bool,
    is_new: bool,
    is_hot: bool,
    goods_sn: String,
    name: String,
    click_num: i32,
    sold_num: i32,
    fav_num: i32,
    market_price: f32,
    shop_price: f32,
    goods_brief: String,
    goods_desc: String,
    goods_front_image: String,
}

impl From<GoodsRow> for GoodsRecord {
    fn from(row: GoodsRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            brands_id: row.brands_id,
            on_sale: row.on_sale,
            ship_free: row.ship_free,
            is_new: row.is_new,
            is_hot: row.is_hot,
            goods_sn: row.goods_sn,
            name: row.name,
            click_num: row.click_num,
            sold_num: row.sold_num,
            fav_num: row.fav_num,
            market_price: row.market_price,
            shop_price: row.shop_price,
            goods_brief: row.goods_brief,
            goods_desc: row.goods_desc,
            goods_front_image: row.goods_front_image,
        }
    }
}

/// MySQL implementation of the catalog store.
///
/// Reads run against the pool; writes go through [`MySqlCatalogTransaction`].
pub struct MySqlCatalogStore {
    pool: MySqlPool,
}

impl MySqlCatalogStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url`.
    ///
    /// # Returns
    ///
    /// * `Ok(MySqlCatalogStore)` - Store backed by a fresh connection pool
    /// * `Err(CatalogStoreError)` - If the database is unreachable
    pub async fn connect(database_url: &str) -> Result<Self, CatalogStoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(|e| CatalogStoreError::unavailable(e.to_string()))?;

        info!("Connected to catalog database");
        Ok(Self::new(pool))
    }

    /// Applies the bundled catalog migrations.
    pub async fn migrate(&self) -> Result<(), CatalogStoreError> {
        sqlx::migrate!("src/mysql/migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(())
    }

    async fn row_exists(&self, sql: &str, id: i32) -> Result<bool, CatalogStoreError> {
        let found: Option<i32> = sqlx::query_scalar(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl CatalogStore for MySqlCatalogStore {
    async fn get_goods(&self, id: u64) -> Result<GoodsRecord, CatalogStoreError> {
        let sql = format!("SELECT {} FROM goods WHERE id = ?", GOODS_COLUMNS);
        sqlx::query_as::<_, GoodsRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(GoodsRecord::from)
            .ok_or(CatalogStoreError::NotFound(id))
    }

    async fn list_goods_by_ids(&self, ids: &[u64]) -> Result<Vec<GoodsRecord>, CatalogStoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder =
            QueryBuilder::<MySql>::new(format!("SELECT {} FROM goods WHERE id IN (", GOODS_COLUMNS));
        let mut separated = query_builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");

        let rows = query_builder
            .build_query_as::<GoodsRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(GoodsRecord::from).collect())
    }

    async fn get_all_goods_ids(&self) -> Result<Vec<u64>, CatalogStoreError> {
        let ids = sqlx::query_scalar::<_, u64>("SELECT id FROM goods ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn brand_exists(&self, brand_id: i32) -> Result<bool, CatalogStoreError> {
        self.row_exists("SELECT id FROM brands WHERE id = ?", brand_id).await
    }

    async fn category_exists(&self, category_id: i32) -> Result<bool, CatalogStoreError> {
        self.row_exists("SELECT id FROM category WHERE id = ?", category_id)
            .await
    }

    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, CatalogStoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlCatalogTransaction { tx }))
    }
}

/// An open MySQL transaction over the goods table.
///
/// Dropping it without calling `commit` rolls back.
pub struct MySqlCatalogTransaction {
    tx: Transaction<'static, MySql>,
}

impl MySqlCatalogTransaction {
    /// Take a row lock on `id`, failing with `NotFound` if there is no such row.
    async fn lock_goods(&mut self, id: u64) -> Result<(), CatalogStoreError> {
        let locked: Option<u64> = sqlx::query_scalar("SELECT id FROM goods WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        locked.map(|_| ()).ok_or(CatalogStoreError::NotFound(id))
    }
}

#[async_trait]
impl CatalogTransaction for MySqlCatalogTransaction {
    async fn create_goods(&mut self, goods: &NewGoods) -> Result<GoodsRecord, CatalogStoreError> {
        let result = sqlx::query(
            "INSERT INTO goods (category_id, brands_id, on_sale, ship_free, is_new, is_hot, \
             goods_sn, name, click_num, sold_num, fav_num, market_price, shop_price, \
             goods_brief, goods_desc, goods_front_image) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(goods.category_id)
        .bind(goods.brands_id)
        .bind(goods.on_sale)
        .bind(goods.ship_free)
        .bind(goods.is_new)
        .bind(goods.is_hot)
        .bind(&goods.goods_sn)
        .bind(&goods.name)
        .bind(goods.click_num)
        .bind(goods.sold_num)
        .bind(goods.fav_num)
        .bind(goods.market_price)
        .bind(goods.shop_price)
        .bind(&goods.goods_brief)
        .bind(&goods.goods_desc)
        .bind(&goods.goods_front_image)
        .execute(&mut *self.tx)
        .await?;

        let id = result.last_insert_id();
        debug!(goods_id = id, "Inserted goods row");
        Ok(goods.clone().into_record(id))
    }

    async fn update_goods(&mut self, goods: &GoodsRecord) -> Result<(), CatalogStoreError> {
        self.lock_goods(goods.id).await?;

        sqlx::query(
            "UPDATE goods SET category_id = ?, brands_id = ?, on_sale = ?, ship_free = ?, \
             is_new = ?, is_hot = ?, goods_sn = ?, name = ?, click_num = ?, sold_num = ?, \
             fav_num = ?, market_price = ?, shop_price = ?, goods_brief = ?, goods_desc = ?, \
             goods_front_image = ? WHERE id = ?",
        )
        .bind(goods.category_id)
        .bind(goods.brands_id)
        .bind(goods.on_sale)
        .bind(goods.ship_free)
        .bind(goods.is_new)
        .bind(goods.is_hot)
        .bind(&goods.goods_sn)
        .bind(&goods.name)
        .bind(goods.click_num)
        .bind(goods.sold_num)
        .bind(goods.fav_num)
        .bind(goods.market_price)
        .bind(goods.shop_price)
        .bind(&goods.goods_brief)
        .bind(&goods.goods_desc)
        .bind(&goods.goods_front_image)
        .bind(goods.id)
        .execute(&mut *self.tx)
        .await?;

        debug!(goods_id = goods.id, "Updated goods row");
        Ok(())
    }

    async fn delete_goods(&mut self, id: u64) -> Result<(), CatalogStoreError> {
        self.lock_goods(id).await?;

        sqlx::query("DELETE FROM goods WHERE id = ?")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        debug!(goods_id = id, "Deleted goods row");
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), CatalogStoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CatalogStoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
