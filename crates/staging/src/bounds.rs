//! Run bounds for a single job step.

use suite_common::{
    apply_offsets, parse_cycle_point, Calendar, CalendarDate, Offset, StreamOverride,
    SuiteError, SuiteResult, TimeWindow,
};
use tracing::{debug, info};

/// Inputs that turn a cycle start date into a processing window.
#[derive(Debug, Clone)]
pub struct RunBounds {
    pub cycle_duration: Offset,
    /// Applied after the cycle duration, e.g. `-P1D`.
    pub extra_offset: Option<Offset>,
    /// Processing never extends past this date.
    pub simulation_end: CalendarDate,
    pub stream_override: Option<StreamOverride>,
    pub calendar: Calendar,
}

impl RunBounds {
    pub fn new(cycle_duration: Offset, simulation_end: CalendarDate) -> Self {
        Self {
            cycle_duration,
            extra_offset: None,
            simulation_end,
            stream_override: None,
            calendar: Calendar::Day360,
        }
    }

    pub fn with_override(mut self, stream_override: Option<StreamOverride>) -> Self {
        self.stream_override = stream_override;
        self
    }

    pub fn with_extra_offset(mut self, offset: Option<Offset>) -> Self {
        self.extra_offset = offset;
        self
    }

    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Window for a job step starting at `job_start`.
    ///
    /// The result may be empty or inverted when a stream override lies
    /// entirely outside the cycle; check [`TimeWindow::has_work`].
    pub fn compute(&self, job_start: CalendarDate) -> SuiteResult<TimeWindow> {
        if self.stream_override.is_some() && self.calendar != Calendar::Day360 {
            return Err(SuiteError::UnsupportedCalendar(self.calendar.to_string()));
        }

        let mut offsets = vec![self.cycle_duration];
        offsets.extend(self.extra_offset);
        let mut start = job_start;
        let mut end = apply_offsets(job_start, &offsets, self.calendar)?;
        end = end.min(self.simulation_end);
        debug!(start = %start, end = %end, "Cycle bounds before stream override");

        if let Some(stream_override) = &self.stream_override {
            let clamp = stream_override.window();
            info!(
                start_year = stream_override.start_year,
                end_year = stream_override.end_year,
                "Applying stream time override"
            );
            start = start.max(clamp.start);
            end = end.min(clamp.end);
        }

        Ok(TimeWindow::new(start, end))
    }
}

/// Compute the window for one job step from the raw strings supplied by
/// the workflow scheduler.
///
/// `stream_override` is either `[<start year>, <end year>]` or `None`.
pub fn compute_bounds(
    start_point: &str,
    cycle_duration: &str,
    simulation_end: CalendarDate,
    stream_override: &str,
) -> SuiteResult<TimeWindow> {
    let job_start = parse_cycle_point(start_point)?;
    RunBounds::new(cycle_duration.parse()?, simulation_end)
        .with_override(StreamOverride::parse(stream_override)?)
        .compute(job_start)
}
