//! Filenames a stream is expected to have written.
//!
//! Sampling starts one file step before the window and stops one step
//! after it (half-open), so a window of `n` whole file steps yields
//! `n + 2` sample days. This guarantees every file overlapping the
//! window is listed even when file boundaries do not line up with the
//! window boundaries; the extra files either side are harmless because
//! the conversion tool applies the window itself.

use suite_common::{CalendarDate, TimeWindow};

use crate::streams::{StreamFamily, StreamSpec};

/// One file the model should have produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpectedFile {
    pub window_start: CalendarDate,
    pub window_end: CalendarDate,
    pub name: String,
    pub substream: Option<String>,
}

/// Ordinal days on which files in and around `window` begin.
fn sample_days(spec: &StreamSpec, window: &TimeWindow) -> impl Iterator<Item = i64> {
    let step = spec.file_step_days();
    let first = window.start.to_ordinal() - step;
    let last = window.end.to_ordinal() + step;
    (first..last).step_by(step as usize)
}

fn atmosphere_name(spec: &StreamSpec, run_id: &str, start: &CalendarDate) -> String {
    let sub_year = if spec.files_per_month == 1 {
        start.month_abbrev().to_string()
    } else {
        format!("{:02}{:02}", start.month, start.day)
    };
    format!("{}a.p{}{}{}.pp", run_id, spec.sub_frequency(), start.year, sub_year)
}

fn sea_ice_name(spec: &StreamSpec, run_id: &str, start: &CalendarDate, end: &CalendarDate) -> String {
    format!(
        "cice_{}i_1{}_{}-{}.nc",
        run_id,
        spec.sub_frequency(),
        start.compact(),
        end.compact()
    )
}

fn ocean_name(
    spec: &StreamSpec,
    run_id: &str,
    start: &CalendarDate,
    end: &CalendarDate,
    substream: &str,
) -> String {
    format!(
        "nemo_{}o_1{}_{}-{}_{}.nc",
        run_id,
        spec.sub_frequency(),
        start.compact(),
        end.compact(),
        substream
    )
}

/// Files starting on ordinal `day`; ocean streams give one per substream.
fn files_for_day(spec: &StreamSpec, run_id: &str, day: i64) -> Vec<ExpectedFile> {
    let start = CalendarDate::from_ordinal(day);
    let end = CalendarDate::from_ordinal(day + spec.file_step_days());
    let file = |name: String, substream: Option<String>| ExpectedFile {
        window_start: start,
        window_end: end,
        name,
        substream,
    };

    match spec.family {
        StreamFamily::Atmosphere => vec![file(atmosphere_name(spec, run_id, &start), None)],
        StreamFamily::SeaIce => vec![file(sea_ice_name(spec, run_id, &start, &end), None)],
        StreamFamily::Ocean => spec
            .substreams
            .iter()
            .map(|substream| {
                file(
                    ocean_name(spec, run_id, &start, &end, substream),
                    Some(substream.clone()),
                )
            })
            .collect(),
    }
}

/// Lazily list the files `spec` should have for `window`, in increasing
/// date order (and substream order within a date).
///
/// The iterator is a pure function of its inputs; calling again restarts it.
pub fn expected_files<'a>(
    spec: &'a StreamSpec,
    run_id: &'a str,
    window: TimeWindow,
) -> impl Iterator<Item = ExpectedFile> + 'a {
    sample_days(spec, &window).flat_map(move |day| files_for_day(spec, run_id, day))
}
