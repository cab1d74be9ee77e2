//! Turns a flat file listing into the sectioned list shown to the user.


use std::{cmp::Ordering, collections::BTreeSet};

use clap::ValueEnum;

use crate::{archive::ArchivedFile, stores::DEFAULT_CATEGORIES};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    /// Newest first
    #[default]
    DateDesc,
    /// A to Z
    NameAsc,
    /// Z to A
    NameDesc,
    /// Smallest first
    SizeAsc,
    /// Largest first
    SizeDesc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListItem {
    Header(String),
    File(ArchivedFile),
}

/// Display order for categories: defaults in their fixed order, then the
/// user's own categories by name.
pub fn category_order(categories: &BTreeSet<String>) -> Vec<String> {
    let defaults = DEFAULT_CATEGORIES
        .into_iter()
        .filter(|name| categories.contains(*name))
        .map(ToOwned::to_owned);
    let custom = categories
        .iter()
        .filter(|name| !DEFAULT_CATEGORIES.contains(&name.as_str()))
        .cloned();
    defaults.chain(custom).collect()
}

/// Sorts by category position in `category_order`, then by `order`.
/// Categories missing from `category_order` come last, by name.
pub fn sort_files<S: AsRef<str>>(
    mut files: Vec<ArchivedFile>,
    order: SortOrder,
    category_order: &[S],
) -> Vec<ArchivedFile> {
    let rank = |category: &str| {
        category_order
            .iter()
            .position(|known| known.as_ref() == category)
    };

    files.sort_by(|a, b| {
        let by_category = match (rank(&a.category), rank(&b.category)) {
            (Some(a_rank), Some(b_rank)) => a_rank.cmp(&b_rank),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.category.cmp(&b.category),
        };
        by_category.then_with(|| compare(a, b, order))
    });

    files
}

/// Emits a header before each run of files sharing a category.
pub fn group_files(files: Vec<ArchivedFile>) -> Vec<ListItem> {
    let mut items = Vec::with_capacity(files.len());
    let mut current: Option<String> = None;

    for file in files {
        if current.as_deref() != Some(file.category.as_str()) {
            current = Some(file.category.clone());
            items.push(ListItem::Header(file.category.clone()));
        }

        items.push(ListItem::File(file));
    }

    items
}

pub fn arrange<S: AsRef<str>>(
    files: Vec<ArchivedFile>,
    order: SortOrder,
    category_order: &[S],
) -> Vec<ListItem> {
    group_files(sort_files(files, order, category_order))
}

/// Keeps files whose name contains `query`, ignoring case. A blank query
/// keeps everything.
pub fn filter_files(files: Vec<ArchivedFile>, query: &str) -> Vec<ArchivedFile> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return files;
    }

    files
        .into_iter()
        .filter(|file| file.name.to_lowercase().contains(&query))
        .collect()
}

fn compare(a: &ArchivedFile, b: &ArchivedFile, order: SortOrder) -> Ordering {
    match order {
        SortOrder::DateDesc => b.modified.cmp(&a.modified),
        SortOrder::NameAsc => compare_names(a, b),
        SortOrder::NameDesc => compare_names(b, a),
        SortOrder::SizeAsc => a.size.cmp(&b.size),
        SortOrder::SizeDesc => b.size.cmp(&a.size),
    }
}

fn compare_names(a: &ArchivedFile, b: &ArchivedFile) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}
