//! SQL builder for destination search.

use escale_core::search::{DestinationQuery, continent_label};
use rusqlite::{Connection, functions::FunctionFlags, types::Value};

/// Columns the free-text search of [`destination_search`] looks at.
const SEARCH_COLUMNS: [&str; 4] = ["d.name", "d.country", "d.continent", "d.description"];
/// Columns the quick search of [`name_search`] looks at.
const NAME_COLUMNS: [&str; 3] = ["d.name", "d.country", "d.continent"];

/// Register `fold(text)`, the Unicode lowercase of its argument. SQLite's own
/// `lower()`, `LIKE` and `NOCASE` only fold ASCII, which misses `É` and `é`.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "fold",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| {
      let text: Option<String> = ctx.get(0)?;
      Ok(text.map(|t| t.to_lowercase()))
    },
  )
}

/// Escape `LIKE` wildcards so user text only matches literally, lowercased to
/// compare against `fold(column)`. Pairs with `ESCAPE '\'` in the generated SQL.
fn like_pattern(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for c in text.to_lowercase().chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

/// Build the `SELECT` for [`DestinationQuery`] and its positional values.
///
/// Every present filter adds one conjunct. Itinerary filters are grouped in a
/// single `EXISTS`, so one itinerary has to satisfy all of them at once.
pub fn destination_search(query: &DestinationQuery) -> (String, Vec<Value>) {
  let mut conditions: Vec<String> = Vec::new();
  let mut values: Vec<Value> = Vec::new();

  if let Some(text) = query.text.as_deref() {
    text_condition(text, &SEARCH_COLUMNS, &mut conditions, &mut values);
  }

  if let Some(continent) = query.continent.as_deref().filter(|c| !c.trim().is_empty()) {
    conditions.push("fold(d.continent) = ?".to_owned());
    values.push(Value::Text(continent_label(continent).to_lowercase()));
  }

  if query.constrains_itineraries() {
    let mut sql = String::from("EXISTS (SELECT 1 FROM itineraries i");
    let mut inner: Vec<&str> = vec!["i.destination_id = d.id"];

    if let Some(theme) = &query.theme {
      sql.push_str(
        " JOIN itinerary_themes it ON it.itinerary_id = i.id \
          JOIN themes t ON t.id = it.theme_id",
      );
      inner.push("t.slug = ?");
      values.push(Value::Text(theme.trim().to_lowercase()));
    }
    if let Some(min) = query.budget_min {
      inner.push("i.price_from >= ?");
      values.push(Value::Real(min));
    }
    if let Some(max) = query.budget_max {
      inner.push("i.price_from <= ?");
      values.push(Value::Real(max));
    }
    if let Some(range) = query.duration {
      inner.push("CAST(i.duration AS INTEGER) >= ?");
      values.push(Value::Integer(range.min.into()));
      if let Some(max) = range.max {
        inner.push("CAST(i.duration AS INTEGER) <= ?");
        values.push(Value::Integer(max.into()));
      }
    }

    sql.push_str(" WHERE ");
    sql.push_str(&inner.join(" AND "));
    sql.push(')');
    conditions.push(sql);
  }

  (select_destinations(&conditions), values)
}

/// Build the `SELECT` for the quick search: `text` against name, country and
/// continent only.
pub fn name_search(text: &str) -> (String, Vec<Value>) {
  let mut conditions = Vec::new();
  let mut values = Vec::new();
  text_condition(text, &NAME_COLUMNS, &mut conditions, &mut values);
  (select_destinations(&conditions), values)
}

/// One case-insensitive substring match of `text` over any of `columns`.
/// Blank text adds nothing.
fn text_condition(
  text: &str,
  columns: &[&str],
  conditions: &mut Vec<String>,
  values: &mut Vec<Value>,
) {
  let text = text.trim();
  if text.is_empty() {
    return;
  }
  let matches: Vec<String> =
    columns.iter().map(|c| format!("fold({c}) LIKE ? ESCAPE '\\'")).collect();
  conditions.push(format!("({})", matches.join(" OR ")));
  values.extend(std::iter::repeat_n(Value::Text(like_pattern(text)), columns.len()));
}

fn select_destinations(conditions: &[String]) -> String {
  let mut sql = String::from("SELECT d.* FROM destinations d");
  if !conditions.is_empty() {
    sql.push_str(" WHERE ");
    sql.push_str(&conditions.join(" AND "));
  }
  sql.push_str(" ORDER BY d.name, d.id");
  sql
}
