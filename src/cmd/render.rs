/*!
render.rs

Turns a typed reply payload into output lines.

  keys    : one line per key name
  objects : `<id>` or `<id> <lon> <lat>` depending on `DisplayMode`
  stats   : aligned table, or a single line naming the term when nothing matched
  ack     : `OK` (with server elapsed time when reported)

Lines are yielded lazily and always in the order the server listed them.
*/

use std::iter;

use super::format::{StyleOptions, TableOpts, table};
use super::options::DisplayMode;
use crate::tile38::{ObjectRecord, QueryResult, StatsRecord};

/// The one line printed when a stats lookup for `term` matched nothing.
pub fn no_stats_line(term: &str) -> String {
    format!("No objects found for term {term}.")
}

const STATS_HEADERS: [&str; 4] = ["Memory Used", "Object Count", "Point Count", "String Count"];

/// Render with the terminal style detected from the environment.
///
/// `term` is the stats key (or `*`) and only shows up for an empty stats reply.
pub fn render<'a>(
    payload: &'a QueryResult,
    mode: DisplayMode,
    term: &str,
) -> Box<dyn Iterator<Item = String> + 'a> {
    render_with(payload, mode, term, &StyleOptions::detect())
}

pub fn render_with<'a>(
    payload: &'a QueryResult,
    mode: DisplayMode,
    term: &str,
    style: &StyleOptions,
) -> Box<dyn Iterator<Item = String> + 'a> {
    match payload {
        QueryResult::Keys(keys) => Box::new(keys.iter().cloned()),
        QueryResult::Objects(objects) => {
            Box::new(objects.iter().map(move |o| object_line(o, mode)))
        }
        QueryResult::Stats(None) => Box::new(iter::once(no_stats_line(term))),
        QueryResult::Stats(Some(stats)) => {
            let rendered = stats_table(stats, style);
            let lines: Vec<String> = rendered.lines().map(str::to_string).collect();
            Box::new(lines.into_iter())
        }
        QueryResult::Ack { elapsed } => Box::new(iter::once(match elapsed {
            Some(e) => format!("OK ({e})"),
            None => "OK".to_string(),
        })),
    }
}

fn object_line(object: &ObjectRecord, mode: DisplayMode) -> String {
    match (mode.coordinates, object.point) {
        (true, Some((lon, lat))) => format!("{} {lon} {lat}", object.id),
        _ => object.id.clone(),
    }
}

fn stats_table(stats: &StatsRecord, style: &StyleOptions) -> String {
    let cell = |v: Option<u64>| v.map_or_else(|| "-".to_string(), |n| n.to_string());
    let row = vec![
        cell(stats.in_memory_size),
        cell(stats.num_objects),
        cell(stats.num_points),
        cell(stats.num_strings),
    ];
    table(&STATS_HEADERS, &[row], TableOpts::default(), style)
}
