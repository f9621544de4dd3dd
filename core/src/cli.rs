use crate::geo::{format_clock_clamped, format_distance_km, format_pace, RoundTo};
use crate::models::{MetricsSnapshot, Run};

/// Live-visning av pågående økt: distanse, pace nå, snittpace, varighet.
pub fn live_line(s: &MetricsSnapshot) -> String {
    format!(
        "{} km | pace {} | avg {} | {}",
        format_distance_km(s.total_distance_m),
        format_pace(s.current_pace_s_per_km),
        format_pace(s.average_pace_s_per_km),
        format_clock_clamped(s.elapsed_s),
    )
}

pub fn run_report(run: &Run) -> String {
    let mut out = String::new();
    out.push_str("--- Run Report ---\n");
    out.push_str(&format!("Id: {}\n", run.id()));
    out.push_str(&format!("Started: {}\n", run.started_at().format("%Y-%m-%d %H:%M:%S UTC")));
    out.push_str(&format!("Distance: {} km\n", format_distance_km(run.total_distance_m())));
    out.push_str(&format!("Duration: {}\n", format_clock_clamped(run.elapsed_s())));
    match run.average_pace_s_per_km() {
        Some(p) => out.push_str(&format!(
            "Avg pace: {} /km ({} s/km)\n",
            format_pace(Some(p)),
            p.round_to(2)
        )),
        None => out.push_str("Avg pace: --\n"),
    }
    out.push_str(&format!("Route points: {}\n", run.route().len()));
    if let Some(a) = run.artifact() {
        out.push_str(&format!("Artifact: {}\n", a.0));
    }
    out
}

pub fn print_run_report(run: &Run) {
    print!("{}", run_report(run));
}
