//! In-memory catalog and search index used by the integration tests.
//!
//! The catalog stages transactional writes and only publishes them on commit, so
//! tests can observe what readers see before and after a commit or rollback.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use catalog_sync_repository::{
    CatalogStore, CatalogStoreError, CatalogTransaction, SearchIndexError, SearchIndexStore,
};
use catalog_sync_shared::{
    GoodsFilter, GoodsRecord, GoodsSearchDocument, GoodsSearchPage, NewGoods,
};

pub const BRAND_ID: i32 = 7;
pub const CATEGORY_ID: i32 = 3;

pub fn goods(id: u64, name: &str, price: f32) -> GoodsRecord {
    new_goods(name, price).into_record(id)
}

pub fn new_goods(name: &str, price: f32) -> NewGoods {
    NewGoods {
        category_id: CATEGORY_ID,
        brands_id: BRAND_ID,
        on_sale: true,
        goods_sn: format!("SN-{}", name),
        name: name.to_string(),
        market_price: price + 1.0,
        shop_price: price,
        goods_brief: format!("{} brief", name),
        ..Default::default()
    }
}

#[derive(Default)]
struct CatalogState {
    rows: BTreeMap<u64, GoodsRecord>,
    next_id: u64,
}

/// Catalog with committed rows behind a mutex and per-transaction staging.
pub struct InMemoryCatalog {
    state: Arc<Mutex<CatalogState>>,
    brands: HashSet<i32>,
    categories: HashSet<i32>,
    unavailable: AtomicBool,
    fail_commit: Arc<AtomicBool>,
    rollbacks: Arc<AtomicUsize>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CatalogState {
                rows: BTreeMap::new(),
                next_id: 1,
            })),
            brands: [BRAND_ID].into_iter().collect(),
            categories: [CATEGORY_ID].into_iter().collect(),
            unavailable: AtomicBool::new(false),
            fail_commit: Arc::new(AtomicBool::new(false)),
            rollbacks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_goods(records: Vec<GoodsRecord>) -> Self {
        let catalog = Self::new();
        for record in records {
            catalog.put(record);
        }
        catalog
    }

    /// Write a committed row directly, bypassing any transaction.
    pub fn put(&self, record: GoodsRecord) {
        let mut state = self.state.lock().unwrap();
        state.next_id = state.next_id.max(record.id + 1);
        state.rows.insert(record.id, record);
    }

    /// Delete a committed row directly.
    pub fn remove(&self, id: u64) {
        self.state.lock().unwrap().rows.remove(&id);
    }

    pub fn row(&self, id: u64) -> Option<GoodsRecord> {
        self.state.lock().unwrap().rows.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().rows.len()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fail_next_commits(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn rollback_count(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), CatalogStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CatalogStoreError::unavailable("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn get_goods(&self, id: u64) -> Result<GoodsRecord, CatalogStoreError> {
        self.check_available()?;
        self.row(id).ok_or(CatalogStoreError::NotFound(id))
    }

    async fn list_goods_by_ids(&self, ids: &[u64]) -> Result<Vec<GoodsRecord>, CatalogStoreError> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| state.rows.get(id).cloned())
            .collect())
    }

    async fn get_all_goods_ids(&self) -> Result<Vec<u64>, CatalogStoreError> {
        self.check_available()?;
        Ok(self.state.lock().unwrap().rows.keys().copied().collect())
    }

    async fn brand_exists(&self, brand_id: i32) -> Result<bool, CatalogStoreError> {
        self.check_available()?;
        Ok(self.brands.contains(&brand_id))
    }

    async fn category_exists(&self, category_id: i32) -> Result<bool, CatalogStoreError> {
        self.check_available()?;
        Ok(self.categories.contains(&category_id))
    }

    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, CatalogStoreError> {
        self.check_available()?;
        Ok(Box::new(InMemoryTransaction {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
            fail_commit: Arc::clone(&self.fail_commit),
            rollbacks: Arc::clone(&self.rollbacks),
        }))
    }
}

enum Staged {
    Upsert(GoodsRecord),
    Delete(u64),
}

pub struct InMemoryTransaction {
    state: Arc<Mutex<CatalogState>>,
    staged: Vec<Staged>,
    fail_commit: Arc<AtomicBool>,
    rollbacks: Arc<AtomicUsize>,
}

#[async_trait]
impl CatalogTransaction for InMemoryTransaction {
    async fn create_goods(&mut self, goods: &NewGoods) -> Result<GoodsRecord, CatalogStoreError> {
        let id = {
            let mut state = self.state.lock().unwrap();
            let id = state.next_id;
            state.next_id += 1;
            id
        };
        let record = goods.clone().into_record(id);
        self.staged.push(Staged::Upsert(record.clone()));
        Ok(record)
    }

    async fn update_goods(&mut self, goods: &GoodsRecord) -> Result<(), CatalogStoreError> {
        if !self.state.lock().unwrap().rows.contains_key(&goods.id) {
            return Err(CatalogStoreError::NotFound(goods.id));
        }
        self.staged.push(Staged::Upsert(goods.clone()));
        Ok(())
    }

    async fn delete_goods(&mut self, id: u64) -> Result<(), CatalogStoreError> {
        if !self.state.lock().unwrap().rows.contains_key(&id) {
            return Err(CatalogStoreError::NotFound(id));
        }
        self.staged.push(Staged::Delete(id));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), CatalogStoreError> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(CatalogStoreError::unavailable("commit failed"));
        }
        let mut state = self.state.lock().unwrap();
        for op in self.staged {
            match op {
                Staged::Upsert(record) => {
                    state.rows.insert(record.id, record);
                }
                Staged::Delete(id) => {
                    state.rows.remove(&id);
                }
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CatalogStoreError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Search index keyed by document id, with per-id write failure injection.
#[derive(Default)]
pub struct InMemoryIndex {
    documents: Mutex<BTreeMap<u64, GoodsSearchDocument>>,
    failing_ids: Mutex<HashSet<u64>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document directly.
    pub fn put(&self, document: GoodsSearchDocument) {
        self.documents.lock().unwrap().insert(document.id, document);
    }

    pub fn document(&self, id: u64) -> Option<GoodsSearchDocument> {
        self.documents.lock().unwrap().get(&id).cloned()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.documents.lock().unwrap().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn fail_writes_for(&self, id: u64) {
        self.failing_ids.lock().unwrap().insert(id);
    }

    pub fn clear_failures(&self) {
        self.failing_ids.lock().unwrap().clear();
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Successful create, update and delete calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_write(&self, id: u64) -> Result<(), SearchIndexError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SearchIndexError::connection("connection refused"));
        }
        if self.failing_ids.lock().unwrap().contains(&id) {
            return Err(SearchIndexError::index(format!("write rejected for {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndexStore for InMemoryIndex {
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn create_document(&self, document: &GoodsSearchDocument) -> Result<(), SearchIndexError> {
        self.check_write(document.id)?;
        self.put(document.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_document(&self, document: &GoodsSearchDocument) -> Result<(), SearchIndexError> {
        self.check_write(document.id)?;
        let mut documents = self.documents.lock().unwrap();
        match documents.get_mut(&document.id) {
            Some(existing) => {
                *existing = document.clone();
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(SearchIndexError::document_not_found(document.id)),
        }
    }

    async fn delete_document(&self, id: u64) -> Result<(), SearchIndexError> {
        self.check_write(id)?;
        self.documents.lock().unwrap().remove(&id);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn search(&self, filter: &GoodsFilter) -> Result<GoodsSearchPage, SearchIndexError> {
        let documents = self.documents.lock().unwrap();
        let matching: Vec<GoodsSearchDocument> = documents
            .values()
            .filter(|doc| match &filter.keywords {
                Some(keywords) => doc.name.contains(keywords.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        Ok(GoodsSearchPage {
            total: matching.len() as u64,
            documents: matching
                .into_iter()
                .skip(filter.offset() as usize)
                .take(filter.page_size() as usize)
                .collect(),
        })
    }

    async fn scan_document_ids(
        &self,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<u64>, SearchIndexError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SearchIndexError::connection("connection refused"));
        }
        let documents = self.documents.lock().unwrap();
        Ok(documents
            .keys()
            .copied()
            .filter(|id| after.map_or(true, |after| *id > after))
            .take(limit)
            .collect())
    }
}
