//! Possession-sequence extractor: segments a canonical, time-ordered
//! event stream into `PossessionSequence`s.
//!
//! Grounded on `original_source/.../entities/possession_sequence.py`
//! for the entity shape; the segmentation rule itself has no
//! original_source counterpart (the Python backend never implements
//! the use case, only the entity) and is built directly from the
//! boundary rules spelled out for this component.

use crate::domain::event::Event;
use crate::domain::possession::PossessionSequence;

pub const MIN_EVENTS: usize = 3;

/// Segments `events` (must already be sorted by timestamp) into
/// possession sequences, dropping any sequence shorter than
/// `MIN_EVENTS`. `frame_of` maps an event's timestamp to a frame id
/// for the sequence's start/end frame bookkeeping.
pub fn extract_sequences(
    match_id: &str,
    events: &[Event],
    fps: f64,
    frame_of: impl Fn(&Event) -> i64,
) -> Vec<PossessionSequence> {
    let mut sequences = Vec::new();
    let mut current: Vec<Event> = Vec::new();
    let mut current_team: Option<String> = None;
    let mut seq_index = 0usize;

    let mut flush = |current: &mut Vec<Event>, team: &Option<String>, sequences: &mut Vec<PossessionSequence>, seq_index: &mut usize| {
        if current.len() >= MIN_EVENTS {
            if let Some(team_id) = team {
                let start_frame = frame_of(&current[0]);
                let end_frame = frame_of(current.last().unwrap());
                sequences.push(PossessionSequence::new(
                    format!("{match_id}-seq-{seq_index}"),
                    match_id,
                    team_id.clone(),
                    start_frame,
                    end_frame,
                    std::mem::take(current),
                ));
                *seq_index += 1;
            }
        }
        current.clear();
    };

    for event in events {
        let team_changed = match (&current_team, &event.team_id) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        };

        if team_changed {
            flush(&mut current, &current_team, &mut sequences, &mut seq_index);
            current_team = event.team_id.clone();
        } else if current_team.is_none() {
            current_team = event.team_id.clone();
        }

        current.push(event.clone());

        let kind = current.last().unwrap().event_type;
        if kind.is_sequence_terminal() || kind.is_turnover() {
            flush(&mut current, &current_team, &mut sequences, &mut seq_index);
            current_team = None;
        }
    }
    flush(&mut current, &current_team, &mut sequences, &mut seq_index);

    let _ = fps;
    sequences
}
