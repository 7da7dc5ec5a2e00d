//! sled-backed [`IndexStore`].
//!
//! Rows are bincode encoded and keyed by big-endian ids. Secondary trees map
//! `(site, path)` and `(site, text)` to ids and carry the posting index in
//! both directions.

use crate::index::{Lemma, LemmaId, NewPage, Page, PageId, Posting, Site, SiteId, SiteStatus};
use crate::store::IndexStore;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};
use std::collections::HashSet;
use std::path::Path;
use time::OffsetDateTime;

const TEXT_SEPARATOR: u8 = 0xFF;

pub struct SledStore {
    db: Db,
    sites: Tree,
    pages: Tree,
    page_paths: Tree,
    lemmas: Tree,
    lemma_keys: Tree,
    lemma_texts: Tree,
    postings: Tree,
    lemma_postings: Tree,
}

fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn pair_key(a: u64, b: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&a.to_be_bytes());
    key.extend_from_slice(&b.to_be_bytes());
    key
}

fn scoped_key(site_id: SiteId, s: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + s.len());
    key.extend_from_slice(&site_id.to_be_bytes());
    key.extend_from_slice(s.as_bytes());
    key
}

fn text_prefix(text: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(text.len() + 1);
    key.extend_from_slice(text.as_bytes());
    key.push(TEXT_SEPARATOR);
    key
}

fn text_key(text: &str, site_id: SiteId) -> Vec<u8> {
    let mut key = text_prefix(text);
    key.extend_from_slice(&site_id.to_be_bytes());
    key
}

fn read_id(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[..n].copy_from_slice(&bytes[..n]);
    u64::from_be_bytes(buf)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Store backed by a throwaway sled database that is removed on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        Ok(Self {
            sites: db.open_tree("sites")?,
            pages: db.open_tree("pages")?,
            page_paths: db.open_tree("page_paths")?,
            lemmas: db.open_tree("lemmas")?,
            lemma_keys: db.open_tree("lemma_keys")?,
            lemma_texts: db.open_tree("lemma_texts")?,
            postings: db.open_tree("postings")?,
            lemma_postings: db.open_tree("lemma_postings")?,
            db,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn next_id(&self) -> Result<u64> {
        // sled ids start at zero; keep zero free
        Ok(self.db.generate_id()? + 1)
    }

    fn get<T: DeserializeOwned>(tree: &Tree, id: u64) -> Result<Option<T>> {
        match tree.get(id_key(id))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn values<T: DeserializeOwned>(tree: &Tree) -> Result<Vec<T>> {
        let mut out = Vec::new();
        for item in tree.iter() {
            let (_, bytes) = item?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }
}

impl IndexStore for SledStore {
    fn clear(&self) -> Result<()> {
        for tree in [
            &self.lemma_postings,
            &self.postings,
            &self.lemma_texts,
            &self.lemma_keys,
            &self.lemmas,
            &self.page_paths,
            &self.pages,
            &self.sites,
        ] {
            tree.clear()?;
        }
        Ok(())
    }

    fn insert_site(&self, url: &str, name: &str, status: SiteStatus) -> Result<Site> {
        let site = Site {
            id: self.next_id()?,
            url: url.to_string(),
            name: name.to_string(),
            status,
            status_time: OffsetDateTime::now_utc(),
            last_error: None,
        };
        self.sites.insert(id_key(site.id), encode(&site)?)?;
        Ok(site)
    }

    fn update_site_status(&self, id: SiteId, status: SiteStatus, last_error: Option<&str>) -> Result<()> {
        if let Some(mut site) = Self::get::<Site>(&self.sites, id)? {
            site.status = status;
            site.status_time = OffsetDateTime::now_utc();
            site.last_error = last_error.map(str::to_string);
            self.sites.insert(id_key(id), encode(&site)?)?;
        }
        Ok(())
    }

    fn site(&self, id: SiteId) -> Result<Option<Site>> {
        Self::get(&self.sites, id)
    }

    fn site_by_url(&self, url: &str) -> Result<Option<Site>> {
        Ok(Self::values::<Site>(&self.sites)?.into_iter().find(|s| s.url == url))
    }

    fn sites(&self) -> Result<Vec<Site>> {
        Self::values(&self.sites)
    }

    fn page_by_path(&self, site_id: SiteId, path: &str) -> Result<Option<Page>> {
        match self.page_paths.get(scoped_key(site_id, path))? {
            Some(id) => Self::get(&self.pages, read_id(&id)),
            None => Ok(None),
        }
    }

    fn insert_page(&self, page: NewPage) -> Result<Page> {
        let id = self.next_id()?;
        let claimed = self.page_paths.compare_and_swap(
            scoped_key(page.site_id, &page.path),
            None as Option<&[u8]>,
            Some(id_key(id).to_vec()),
        )?;
        if claimed.is_err() {
            return Err(Error::Duplicate { kind: "page", key: page.path });
        }
        let row = Page {
            id,
            site_id: page.site_id,
            path: page.path,
            status_code: page.status_code,
            content: page.content,
        };
        self.pages.insert(id_key(id), encode(&row)?)?;
        Ok(row)
    }

    fn pages_by_ids(&self, ids: &[PageId]) -> Result<Vec<Page>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(page) = Self::get(&self.pages, *id)? {
                out.push(page);
            }
        }
        Ok(out)
    }

    fn delete_page(&self, id: PageId) -> Result<()> {
        let Some(page) = Self::get::<Page>(&self.pages, id)? else {
            return Ok(());
        };
        for item in self.postings.scan_prefix(id_key(id)) {
            let (key, _) = item?;
            let lemma_id = read_id(&key[8..]);
            self.lemma_postings.remove(pair_key(lemma_id, id))?;
            self.postings.remove(key)?;
        }
        self.page_paths.remove(scoped_key(page.site_id, &page.path))?;
        self.pages.remove(id_key(id))?;
        Ok(())
    }

    fn count_pages(&self, site_id: Option<SiteId>) -> Result<usize> {
        Ok(match site_id {
            Some(site) => self.page_paths.scan_prefix(id_key(site)).count(),
            None => self.pages.len(),
        })
    }

    fn site_pages(&self, site_id: SiteId) -> Result<Vec<Page>> {
        let mut out = Vec::new();
        for item in self.page_paths.scan_prefix(id_key(site_id)) {
            let (_, id) = item?;
            if let Some(page) = Self::get(&self.pages, read_id(&id))? {
                out.push(page);
            }
        }
        Ok(out)
    }

    fn lemma(&self, site_id: SiteId, text: &str) -> Result<Option<Lemma>> {
        match self.lemma_keys.get(scoped_key(site_id, text))? {
            Some(id) => Self::get(&self.lemmas, read_id(&id)),
            None => Ok(None),
        }
    }

    fn lemma_by_id(&self, id: LemmaId) -> Result<Option<Lemma>> {
        Self::get(&self.lemmas, id)
    }

    fn insert_lemma(&self, site_id: SiteId, text: &str, document_frequency: u32) -> Result<Lemma> {
        let id = self.next_id()?;
        let claimed = self.lemma_keys.compare_and_swap(
            scoped_key(site_id, text),
            None as Option<&[u8]>,
            Some(id_key(id).to_vec()),
        )?;
        if claimed.is_err() {
            return Err(Error::Duplicate { kind: "lemma", key: text.to_string() });
        }
        let lemma = Lemma { id, site_id, text: text.to_string(), document_frequency };
        self.lemma_texts.insert(text_key(text, site_id), id_key(id).to_vec())?;
        self.lemmas.insert(id_key(id), encode(&lemma)?)?;
        Ok(lemma)
    }

    fn set_document_frequency(&self, id: LemmaId, document_frequency: u32) -> Result<()> {
        if let Some(mut lemma) = Self::get::<Lemma>(&self.lemmas, id)? {
            lemma.document_frequency = document_frequency;
            self.lemmas.insert(id_key(id), encode(&lemma)?)?;
        }
        Ok(())
    }

    fn delete_lemma(&self, id: LemmaId) -> Result<()> {
        let Some(lemma) = Self::get::<Lemma>(&self.lemmas, id)? else {
            return Ok(());
        };
        for item in self.lemma_postings.scan_prefix(id_key(id)) {
            let (key, _) = item?;
            let page_id = read_id(&key[8..]);
            self.postings.remove(pair_key(page_id, id))?;
            self.lemma_postings.remove(key)?;
        }
        self.lemma_texts.remove(text_key(&lemma.text, lemma.site_id))?;
        self.lemma_keys.remove(scoped_key(lemma.site_id, &lemma.text))?;
        self.lemmas.remove(id_key(id))?;
        Ok(())
    }

    fn lemmas_by_text(&self, text: &str, site_id: Option<SiteId>) -> Result<Vec<Lemma>> {
        if let Some(site) = site_id {
            return Ok(self.lemma(site, text)?.into_iter().collect());
        }
        let mut out = Vec::new();
        for item in self.lemma_texts.scan_prefix(text_prefix(text)) {
            let (_, id) = item?;
            if let Some(lemma) = Self::get(&self.lemmas, read_id(&id))? {
                out.push(lemma);
            }
        }
        Ok(out)
    }

    fn count_lemmas(&self, site_id: Option<SiteId>) -> Result<usize> {
        Ok(match site_id {
            Some(site) => self.lemma_keys.scan_prefix(id_key(site)).count(),
            None => self.lemmas.len(),
        })
    }

    fn site_lemmas(&self, site_id: SiteId) -> Result<Vec<Lemma>> {
        let mut out = Vec::new();
        for item in self.lemma_keys.scan_prefix(id_key(site_id)) {
            let (_, id) = item?;
            if let Some(lemma) = Self::get(&self.lemmas, read_id(&id))? {
                out.push(lemma);
            }
        }
        Ok(out)
    }

    fn add_posting(&self, page_id: PageId, lemma_id: LemmaId, weight: f32) -> Result<()> {
        // callers serialize writers per site, so read-modify-write is safe here
        let key = pair_key(page_id, lemma_id);
        let posting = match self.postings.get(&key)? {
            Some(bytes) => {
                let mut existing: Posting = decode(&bytes)?;
                existing.weight += weight;
                existing
            }
            None => Posting { id: self.next_id()?, page_id, lemma_id, weight },
        };
        self.postings.insert(key, encode(&posting)?)?;
        self.lemma_postings.insert(pair_key(lemma_id, page_id), &[] as &[u8])?;
        Ok(())
    }

    fn postings_for_page(&self, page_id: PageId) -> Result<Vec<Posting>> {
        let mut out = Vec::new();
        for item in self.postings.scan_prefix(id_key(page_id)) {
            let (_, bytes) = item?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }

    fn page_ids_for_lemma(&self, text: &str, site_id: Option<SiteId>) -> Result<HashSet<PageId>> {
        let mut ids = HashSet::new();
        for lemma in self.lemmas_by_text(text, site_id)? {
            for item in self.lemma_postings.scan_prefix(id_key(lemma.id)) {
                let (key, _) = item?;
                ids.insert(read_id(&key[8..]));
            }
        }
        Ok(ids)
    }
}
