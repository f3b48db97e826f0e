// app/src/models/issue.rs

use serde::Serialize;
use sqlx::FromRow;

pub const DEFAULT_PREVIEW_PAGES: i32 = 3;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Issue {
  /// Slug, also the cart id of the printed copy.
  pub id: String,
  pub title: String,
  /// Object path of the PDF inside the storage bucket.
  pub pdf_path: String,
  pub stock: i32,
  pub preview_pages: Option<i32>,
}

impl Issue {
  pub fn preview_page_count(&self) -> i32 {
    self.preview_pages.filter(|p| *p > 0).unwrap_or(DEFAULT_PREVIEW_PAGES)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecrement {
  Applied { remaining: i32 },
  /// Not enough stock, or no such issue. Nothing was changed.
  Rejected,
}
