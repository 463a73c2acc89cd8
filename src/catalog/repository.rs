//! Database operations for catalog books, authors and identifiers.

use chrono::Utc;
use sqlx::sqlite::{SqliteConnection, SqlitePool};

use super::{Book, CatalogError, CatalogStats};
use crate::enrichment::domain::{BookRecord, Identifier, IdentifierKind};
use crate::isbn;

/// How many authors [`CatalogRepository::stats`] reports
const TOP_AUTHORS: i64 = 10;

const BOOK_COLUMNS: &str = "id, isbn, title, subtitle, description, publisher, published_date, \
     page_count, language, categories, thumbnail, preview_link, rating, reviews_count, review, \
     source, created_at, updated_at";

// ============================================================================
// Database Row Types
// ============================================================================

/// Database row for the books table.
#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: i64,
    isbn: String,
    title: String,
    subtitle: Option<String>,
    description: Option<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    page_count: Option<i64>,
    language: Option<String>,
    categories: String,
    thumbnail: Option<String>,
    preview_link: Option<String>,
    rating: Option<f64>,
    reviews_count: Option<i64>,
    review: Option<String>,
    source: Option<String>,
    created_at: String,
    updated_at: String,
}

impl BookRow {
    fn into_book(self, authors: Vec<String>, identifiers: Vec<Identifier>) -> Result<Book, CatalogError> {
        let categories = serde_json::from_str(&self.categories)?;
        Ok(Book {
            id: self.id,
            isbn: self.isbn,
            title: self.title,
            subtitle: self.subtitle,
            authors,
            description: self.description,
            publisher: self.publisher,
            published_date: self.published_date,
            page_count: self.page_count,
            language: self.language,
            categories,
            thumbnail: self.thumbnail,
            preview_link: self.preview_link,
            rating: self.rating,
            reviews_count: self.reviews_count,
            review: self.review,
            source: self.source,
            identifiers,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Persistence for catalog entities.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Get a book by database ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Book>, CatalogError> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?");
        let row: Option<BookRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Get a book by its primary ISBN or any of its alternate identifiers.
    ///
    /// A valid ISBN also matches its other form (ISBN-10 <-> ISBN-13).
    pub async fn get_by_isbn(&self, isbn: &str) -> Result<Option<Book>, CatalogError> {
        let normalized = isbn::normalize(isbn);
        if normalized.is_empty() {
            return Ok(None);
        }

        let converted = match normalized.len() {
            10 => isbn::to_isbn13(&normalized),
            13 => isbn::to_isbn10(&normalized),
            _ => None,
        };

        for candidate in std::iter::once(normalized).chain(converted) {
            let row: Option<(i64,)> = sqlx::query_as(
                r#"
                SELECT id FROM books WHERE isbn = ?
                UNION
                SELECT book_id FROM book_identifiers WHERE value = ?
                LIMIT 1
                "#,
            )
            .bind(&candidate)
            .bind(&candidate)
            .fetch_optional(&self.pool)
            .await?;

            if let Some((id,)) = row {
                return self.get_by_id(id).await;
            }
        }

        Ok(None)
    }

    /// List books ordered by title.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Book>, CatalogError> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY title, id LIMIT ? OFFSET ?");
        let rows: Vec<BookRow> = sqlx::query_as(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let mut books = Vec::with_capacity(rows.len());
        for row in rows {
            books.push(self.hydrate(row).await?);
        }
        Ok(books)
    }

    /// Books whose title or an author's name contains `text` (case-insensitive).
    pub async fn search(&self, text: &str, limit: i64) -> Result<Vec<Book>, CatalogError> {
        let pattern = format!("%{}%", text.trim());
        let ids: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT b.id
            FROM books b
            LEFT JOIN book_authors ba ON ba.book_id = b.id
            LEFT JOIN authors a ON a.id = ba.author_id
            WHERE b.title LIKE ? OR a.name LIKE ?
            ORDER BY b.title, b.id
            LIMIT ?
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut books = Vec::with_capacity(ids.len());
        for (id,) in ids {
            if let Some(book) = self.get_by_id(id).await? {
                books.push(book);
            }
        }
        Ok(books)
    }

    /// Author names of a book, in credited order.
    pub async fn authors(&self, book_id: i64) -> Result<Vec<String>, CatalogError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT a.name
            FROM book_authors ba
            JOIN authors a ON a.id = ba.author_id
            WHERE ba.book_id = ?
            ORDER BY ba.position, a.name
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Alternate identifiers of a book, in insertion order.
    pub async fn identifiers(&self, book_id: i64) -> Result<Vec<Identifier>, CatalogError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT kind, value FROM book_identifiers WHERE book_id = ? ORDER BY id")
                .bind(book_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(kind, value)| Identifier::new(IdentifierKind::parse(&kind), value))
            .collect())
    }

    /// Totals, books per publication year and the most prolific authors.
    pub async fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let (total_books,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        let books_by_year: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT substr(published_date, 1, 4) AS year, COUNT(*)
            FROM books
            WHERE published_date IS NOT NULL AND published_date != ''
            GROUP BY year
            ORDER BY year DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let top_authors: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT a.name, COUNT(*) AS books
            FROM authors a
            JOIN book_authors ba ON ba.author_id = a.id
            GROUP BY a.id
            ORDER BY books DESC, a.name
            LIMIT ?
            "#,
        )
        .bind(TOP_AUTHORS)
        .fetch_all(&self.pool)
        .await?;

        Ok(CatalogStats {
            total_books,
            books_by_year,
            top_authors,
        })
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a book from an enrichment record.
    ///
    /// The primary ISBN must pass checksum validation and is stored
    /// normalized. Authors are linked (created if unseen) and the record's
    /// ISBN identifiers are attached.
    pub async fn create(&self, record: &BookRecord) -> Result<i64, CatalogError> {
        let isbn = isbn::validate(&record.isbn).map_err(|source| CatalogError::InvalidIsbn {
            isbn: record.isbn.clone(),
            source,
        })?;
        let categories = serde_json::to_string(&record.categories)?;
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO books (isbn, title, subtitle, description, publisher, published_date,
                               page_count, language, categories, thumbnail, preview_link, rating,
                               reviews_count, review, source, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&isbn)
        .bind(record.title.as_deref().unwrap_or_default())
        .bind(&record.subtitle)
        .bind(&record.description)
        .bind(&record.publisher)
        .bind(&record.published_date)
        .bind(record.page_count.map(i64::from))
        .bind(&record.language)
        .bind(&categories)
        .bind(&record.thumbnail)
        .bind(&record.preview_link)
        .bind(record.rating)
        .bind(record.reviews_count.map(i64::from))
        .bind(&record.review)
        .bind(&record.source)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let book_id = result.last_insert_rowid();

        link_authors(&mut tx, book_id, &record.authors).await?;
        insert_identifier(&mut tx, book_id, &Identifier::isbn(isbn)).await?;
        for identifier in record.identifiers.iter().filter(|id| id.kind.is_isbn()) {
            insert_identifier(&mut tx, book_id, identifier).await?;
        }

        tx.commit().await?;
        tracing::info!(book_id, isbn = %record.isbn, "Created catalog book");
        Ok(book_id)
    }

    /// Fill fields that are empty on the stored book from `record`.
    ///
    /// Non-empty stored values are never overwritten. Authors are only
    /// linked when the book has none. Returns `false` if the book doesn't exist.
    pub async fn update_missing(&self, book_id: i64, record: &BookRecord) -> Result<bool, CatalogError> {
        let categories = if record.categories.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&record.categories)?)
        };
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE books SET
                title = CASE WHEN title = '' THEN COALESCE(?, '') ELSE title END,
                subtitle = COALESCE(NULLIF(subtitle, ''), ?),
                description = COALESCE(NULLIF(description, ''), ?),
                publisher = COALESCE(NULLIF(publisher, ''), ?),
                published_date = COALESCE(NULLIF(published_date, ''), ?),
                page_count = COALESCE(NULLIF(page_count, 0), ?),
                language = COALESCE(NULLIF(language, ''), ?),
                categories = CASE WHEN categories = '[]' THEN COALESCE(?, '[]') ELSE categories END,
                thumbnail = COALESCE(NULLIF(thumbnail, ''), ?),
                preview_link = COALESCE(NULLIF(preview_link, ''), ?),
                rating = COALESCE(NULLIF(rating, 0), ?),
                reviews_count = COALESCE(NULLIF(reviews_count, 0), ?),
                review = COALESCE(NULLIF(review, ''), ?),
                source = COALESCE(NULLIF(source, ''), ?),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.title)
        .bind(&record.subtitle)
        .bind(&record.description)
        .bind(&record.publisher)
        .bind(&record.published_date)
        .bind(record.page_count.map(i64::from))
        .bind(&record.language)
        .bind(&categories)
        .bind(&record.thumbnail)
        .bind(&record.preview_link)
        .bind(record.rating)
        .bind(record.reviews_count.map(i64::from))
        .bind(&record.review)
        .bind(&record.source)
        .bind(&now)
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        let (linked,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM book_authors WHERE book_id = ?")
            .bind(book_id)
            .fetch_one(&mut *tx)
            .await?;
        if linked == 0 {
            link_authors(&mut tx, book_id, &record.authors).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Attach an identifier. Returns `false` if the book already had it.
    pub async fn add_identifier(&self, book_id: i64, identifier: &Identifier) -> Result<bool, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(insert_identifier(&mut conn, book_id, identifier).await?)
    }

    /// Delete a book; its identifiers and author links go with it.
    pub async fn delete(&self, book_id: i64) -> Result<bool, CatalogError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn hydrate(&self, row: BookRow) -> Result<Book, CatalogError> {
        let authors = self.authors(row.id).await?;
        let identifiers = self.identifiers(row.id).await?;
        row.into_book(authors, identifiers)
    }
}

/// Get or create an author by exact name.
async fn get_or_create_author(conn: &mut SqliteConnection, name: &str) -> sqlx::Result<i64> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM authors WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some((id,)) = row {
        Ok(id)
    } else {
        let result = sqlx::query("INSERT INTO authors (name) VALUES (?)")
            .bind(name)
            .execute(&mut *conn)
            .await?;
        Ok(result.last_insert_rowid())
    }
}

async fn link_authors(conn: &mut SqliteConnection, book_id: i64, authors: &[String]) -> sqlx::Result<()> {
    let names = authors.iter().map(|a| a.trim()).filter(|a| !a.is_empty());
    for (position, name) in names.enumerate() {
        let author_id = get_or_create_author(conn, name).await?;
        sqlx::query("INSERT OR IGNORE INTO book_authors (book_id, author_id, position) VALUES (?, ?, ?)")
            .bind(book_id)
            .bind(author_id)
            .bind(position as i64)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Insert an identifier unless the (book, kind, value) triple exists.
///
/// ISBN values are stored normalized so lookups match hyphenated input.
async fn insert_identifier(
    conn: &mut SqliteConnection,
    book_id: i64,
    identifier: &Identifier,
) -> sqlx::Result<bool> {
    let value = if identifier.kind.is_isbn() {
        isbn::normalize(&identifier.value)
    } else {
        identifier.value.trim().to_string()
    };
    if value.is_empty() {
        return Ok(false);
    }

    let result = sqlx::query("INSERT OR IGNORE INTO book_identifiers (book_id, kind, value) VALUES (?, ?, ?)")
        .bind(book_id)
        .bind(identifier.kind.as_str())
        .bind(&value)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::init_db;

    async fn repository(temp_dir: &tempfile::TempDir) -> CatalogRepository {
        let db_url = format!("sqlite:{}", temp_dir.path().join("test.db").display());
        CatalogRepository::new(init_db(&db_url).await.unwrap())
    }

    fn record(isbn: &str, title: &str, authors: &[&str]) -> BookRecord {
        BookRecord {
            title: Some(title.to_string()),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            ..BookRecord::new(isbn)
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup_by_any_isbn() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = repository(&temp_dir).await;

        let mut hp = record("9780747532699", "Harry Potter", &["J.K. Rowling"]);
        hp.identifiers = vec![
            Identifier::new(IdentifierKind::Isbn10, "0-7475-3269-9"),
            Identifier::new(IdentifierKind::Other("OCLC".to_string()), "12345"),
        ];
        let id = repo.create(&hp).await.unwrap();

        let by_primary = repo.get_by_isbn("978-0-7475-3269-9").await.unwrap().unwrap();
        let by_alternate = repo.get_by_isbn("0747532699").await.unwrap().unwrap();

        assert_eq!(by_primary.id, id);
        assert_eq!(by_alternate.id, id);
        assert_eq!(by_primary.authors, vec!["J.K. Rowling"]);
        assert_eq!(
            by_primary.identifiers,
            vec![
                Identifier::new(IdentifierKind::Isbn13, "9780747532699"),
                Identifier::new(IdentifierKind::Isbn10, "0747532699"),
            ]
        );
        assert!(repo.get_by_isbn("9780306406157").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_categories_are_reported() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = repository(&temp_dir).await;
        let id = repo.create(&record("9780441013593", "Dune", &[])).await.unwrap();

        sqlx::query("UPDATE books SET categories = 'not json' WHERE id = ?")
            .bind(id)
            .execute(&repo.pool)
            .await
            .unwrap();

        let result = repo.get_by_id(id).await;
        assert!(matches!(result, Err(CatalogError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_lookup_by_converted_isbn_form() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = repository(&temp_dir).await;

        let id = repo.create(&record("9780441013593", "Dune", &["Frank Herbert"])).await.unwrap();

        let by_isbn10 = repo.get_by_isbn("0-441-01359-7").await.unwrap().unwrap();
        assert_eq!(by_isbn10.id, id);
        assert!(repo.get_by_isbn("0441013598").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_isbn() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = repository(&temp_dir).await;

        let err = repo.create(&record("9780747532698", "Bad", &[])).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidIsbn { .. }));
    }

    #[tokio::test]
    async fn test_add_identifier_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = repository(&temp_dir).await;
        let id = repo.create(&record("9780306406157", "Book", &[])).await.unwrap();

        let isbn10 = Identifier::new(IdentifierKind::Isbn10, "0306406152");
        assert!(repo.add_identifier(id, &isbn10).await.unwrap());
        assert!(!repo.add_identifier(id, &isbn10).await.unwrap());
        assert_eq!(repo.identifiers(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_keeps_existing_values() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = repository(&temp_dir).await;
        let id = repo
            .create(&record("9780306406157", "Curated Title", &[]))
            .await
            .unwrap();

        let enriched = BookRecord {
            title: Some("Provider Title".to_string()),
            description: Some("From a provider".to_string()),
            page_count: Some(300),
            categories: vec!["Science".to_string()],
            authors: vec!["Author One".to_string(), "Author Two".to_string()],
            ..BookRecord::new("9780306406157")
        };
        assert!(repo.update_missing(id, &enriched).await.unwrap());

        let book = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(book.title, "Curated Title");
        assert_eq!(book.description.as_deref(), Some("From a provider"));
        assert_eq!(book.page_count, Some(300));
        assert_eq!(book.categories, vec!["Science"]);
        assert_eq!(book.authors, vec!["Author One", "Author Two"]);

        // A second pass fills nothing that is already set
        let later = BookRecord {
            description: Some("Different".to_string()),
            authors: vec!["Someone Else".to_string()],
            ..BookRecord::new("9780306406157")
        };
        repo.update_missing(id, &later).await.unwrap();
        let book = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(book.description.as_deref(), Some("From a provider"));
        assert_eq!(book.authors, vec!["Author One", "Author Two"]);
    }

    #[tokio::test]
    async fn test_update_missing_unknown_book() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = repository(&temp_dir).await;
        assert!(!repo.update_missing(42, &BookRecord::new("1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_cascades_identifiers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = repository(&temp_dir).await;
        let id = repo.create(&record("9780306406157", "Book", &["A"])).await.unwrap();

        assert!(repo.delete(id).await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
        assert!(repo.identifiers(id).await.unwrap().is_empty());
        assert!(repo.get_by_isbn("9780306406157").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_by_title_or_author() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = repository(&temp_dir).await;
        repo.create(&record("9780747532699", "Harry Potter", &["J.K. Rowling"]))
            .await
            .unwrap();
        repo.create(&record("9780306406157", "Other Book", &["Someone"]))
            .await
            .unwrap();

        assert_eq!(repo.search("potter", 10).await.unwrap().len(), 1);
        assert_eq!(repo.search("rowling", 10).await.unwrap()[0].title, "Harry Potter");
        assert_eq!(repo.search("book", 10).await.unwrap().len(), 1);
        assert_eq!(repo.list(10, 0).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stats() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = repository(&temp_dir).await;

        let mut a = record("9780747532699", "A", &["Shared", "Solo"]);
        a.published_date = Some("1997".to_string());
        let mut b = record("9780306406157", "B", &["Shared"]);
        b.published_date = Some("2001-06-01".to_string());
        repo.create(&a).await.unwrap();
        repo.create(&b).await.unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total_books, 2);
        assert_eq!(
            stats.books_by_year,
            vec![("2001".to_string(), 1), ("1997".to_string(), 1)]
        );
        assert_eq!(stats.top_authors[0], ("Shared".to_string(), 2));
    }
}
