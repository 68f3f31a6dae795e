//! # Pages
//!
//! The three catalogue pages. Each page runs fixed queries, projects the
//! rows through a declared column schema and renders a template with the
//! records plus the common data document.

use crate::error::Result;
use crate::state::AppState;
use catalogue_core::json::to_value;
use catalogue_core::{audit, handler, project, ColumnSchema, Handler, HttpResponse, Server};
use serde_json::{Map, Value};
use tracing::{error, warn};

/// Body sent whenever a page fails
pub const ERROR_BODY: &str = "Error querying the database";

/// One query feeding a page
#[derive(Debug)]
pub struct PageQuery {
    /// Key the records are rendered under
    pub key: &'static str,
    /// SQL text
    pub sql: &'static str,
    /// `(column, type tag)` pairs, in output order
    pub columns: &'static [(&'static str, &'static str)],
}

impl PageQuery {
    /// Build the column schema for this query
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownColumnType` if a tag isn't recognised
    pub fn schema(&self) -> catalogue_core::Result<ColumnSchema> {
        ColumnSchema::from_tags(self.columns.iter().copied())
    }
}

/// A routed page
#[derive(Debug)]
pub struct Page {
    /// Route path
    pub path: &'static str,
    /// Template name
    pub template: &'static str,
    /// Queries, run in order
    pub queries: &'static [PageQuery],
}

/// `/`: a few films with their cast, and the first categories
pub static HOME: Page = Page {
    path: "/",
    template: "index",
    queries: &[
        PageQuery {
            key: "movies",
            sql: "
                SELECT
                    f.film_id,
                    f.title,
                    f.release_year,
                    GROUP_CONCAT(CONCAT(a.first_name, ' ', a.last_name) SEPARATOR ', ') AS actors
                FROM film f
                JOIN film_actor fa ON f.film_id = fa.film_id
                JOIN actor a ON fa.actor_id = a.actor_id
                GROUP BY f.film_id
                ORDER BY f.film_id ASC
                LIMIT 5
            ",
            columns: &[
                ("film_id", "number"),
                ("title", "string"),
                ("release_year", "number"),
                ("actors", "string"),
            ],
        },
        PageQuery {
            key: "categories",
            sql: "
                SELECT
                    category_id,
                    name
                FROM category
                ORDER BY category_id ASC
                LIMIT 5
            ",
            columns: &[("category_id", "number"), ("name", "string")],
        },
    ],
};

/// `/movies`: film list with language and cast
pub static MOVIES: Page = Page {
    path: "/movies",
    template: "movies",
    queries: &[PageQuery {
        key: "all_movies",
        sql: "
            SELECT
                f.film_id,
                f.title,
                f.description,
                f.release_year,
                f.rating,
                f.length,
                l.name AS language,
                GROUP_CONCAT(CONCAT(a.first_name, ' ', a.last_name) SEPARATOR ', ') AS actors
            FROM film f
            JOIN language l ON f.language_id = l.language_id
            JOIN film_actor fa ON f.film_id = fa.film_id
            JOIN actor a ON fa.actor_id = a.actor_id
            GROUP BY f.film_id
            ORDER BY f.film_id ASC
            LIMIT 15
        ",
        columns: &[
            ("film_id", "number"),
            ("title", "string"),
            ("description", "string"),
            ("release_year", "number"),
            ("rating", "string"),
            ("length", "number"),
            ("language", "string"),
            ("actors", "string"),
        ],
    }],
};

/// `/customers`: customers with their rental history
pub static CUSTOMERS: Page = Page {
    path: "/customers",
    template: "customers",
    queries: &[PageQuery {
        key: "customers",
        sql: "
            SELECT
                c.customer_id,
                c.first_name,
                c.last_name,
                c.email,
                c.active,
                COUNT(r.rental_id) AS rental_count,
                MAX(r.rental_date) AS last_rental,
                GROUP_CONCAT(
                    DISTINCT CONCAT(f.title, ' (', DATE_FORMAT(r.rental_date, '%d/%m/%Y'), ')')
                    ORDER BY r.rental_date DESC
                    SEPARATOR '|'
                ) AS rental_data
            FROM customer c
            JOIN rental r ON c.customer_id = r.customer_id
            JOIN inventory i ON r.inventory_id = i.inventory_id
            JOIN film f ON i.film_id = f.film_id
            GROUP BY c.customer_id
            ORDER BY c.customer_id ASC
            LIMIT 25
        ",
        columns: &[
            ("customer_id", "number"),
            ("first_name", "string"),
            ("last_name", "string"),
            ("email", "string"),
            ("active", "boolean"),
            ("rental_count", "number"),
            ("last_rental", "date"),
            ("rental_data", "string"),
        ],
    }],
};

/// Every routed page
pub static PAGES: [&Page; 3] = [&HOME, &MOVIES, &CUSTOMERS];

/// Assemble the render context for a page
///
/// All schemas are built before any query runs, so a bad type tag never
/// reaches the database.
///
/// # Errors
///
/// Returns the first schema, query or common data failure
pub async fn build_context(page: &Page, state: &AppState) -> Result<Value> {
    let schemas = page
        .queries
        .iter()
        .map(PageQuery::schema)
        .collect::<catalogue_core::Result<Vec<_>>>()?;

    let mut context = Map::new();
    for (query, schema) in page.queries.iter().zip(&schemas) {
        let rows = state.executor.query(query.sql).await?;

        let soft_failures = audit(&rows, schema);
        if !soft_failures.is_empty() {
            warn!(
                page = page.path,
                key = query.key,
                count = soft_failures.len(),
                first = ?soft_failures.first(),
                "Rows projected with sentinel values"
            );
        }

        let records = project(&rows, schema);
        context.insert(query.key.to_string(), to_value(&records)?);
    }
    context.insert("common".to_string(), state.common.get().await?);

    Ok(Value::Object(context))
}

/// Build the context and render the page's template
///
/// # Errors
///
/// See [`build_context`]; also fails if the template can't render
pub async fn render_page(page: &Page, state: &AppState) -> Result<String> {
    let context = build_context(page, state).await?;
    state.templates.render(page.template, &context)
}

/// HTTP handler for a page
///
/// Any failure is logged and answered with a bare 500.
pub fn page_handler(page: &'static Page, state: AppState) -> Handler {
    handler(move |_req, _matched| {
        let state = state.clone();
        async move {
            match render_page(page, &state).await {
                Ok(html) => HttpResponse::html(html),
                Err(e) => {
                    error!(page = page.path, error = %e, "Failed to render page");
                    HttpResponse::text(ERROR_BODY).with_status(500)
                }
            }
        }
    })
}

/// Route every page on `server`
///
/// # Errors
///
/// Returns `Error::InvalidRoutePattern` if a page path is already taken
pub fn register_pages(server: &mut Server, state: &AppState) -> Result<()> {
    for page in PAGES {
        server.get(page.path, page_handler(page, state.clone()))?;
    }
    Ok(())
}
