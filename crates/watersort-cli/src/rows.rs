//! The CSV row boundary: the fixed external encoding the editor consumes.
//!
//! One header line, then one row per map. Bottles are `#`-joined; the map
//! field is `capacity` digits per bottle (bottom to top, `0`-padded, empty
//! bottles encode as an empty token), the slot-gimmick field is a hidden
//! bitmask of the same shape, and the stack-gimmick field is `kind_param`
//! per bottle. Digit maps cannot express colors above 9; the encoder refuses
//! them rather than truncating.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;
use watersort_core::{Bottle, Color, Generated, Gimmick, GimmickKind, Locks, Params, Slot, State};

pub const HEADER: &str = "index,map,slot_gimmick,stack_gimmick,NumberOfItem,NumberOfSlot,NumberOfStack,MixCount,MinMoves,DifficultyScore,DifficultyLabel";

/// One encoded map row, fields in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub index: usize,
    pub map: String,
    pub slot_gimmick: String,
    pub stack_gimmick: String,
    pub number_of_item: usize,
    pub number_of_slot: usize,
    pub number_of_stack: usize,
    pub mix_count: usize,
    pub min_moves: u32,
    pub difficulty_score: f64,
    pub difficulty_label: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("color {0} does not fit the single-digit map encoding")]
    ColorTooWide(Color),
}

/// Encode one generated map as a row.
pub fn encode(index: usize, g: &Generated) -> Result<CsvRow, RowError> {
    Ok(CsvRow {
        index,
        map: encode_map(&g.state)?,
        slot_gimmick: encode_slot_gimmick(&g.state),
        stack_gimmick: encode_stack_gimmick(&g.state),
        number_of_item: g.state.params.num_colors,
        number_of_slot: g.state.params.capacity,
        number_of_stack: g.state.params.num_bottles,
        mix_count: g.mix_count,
        min_moves: g.min_moves,
        difficulty_score: g.diff_score,
        difficulty_label: g.diff_label.to_string(),
    })
}

fn encode_map(state: &State) -> Result<String, RowError> {
    let mut out = String::new();
    for (i, bottle) in state.bottles.iter().enumerate() {
        if i > 0 {
            out.push('#');
        }
        if bottle.is_empty() {
            continue;
        }
        for k in 0..bottle.capacity {
            match bottle.slots.get(k) {
                Some(slot) => {
                    if slot.color > 9 {
                        return Err(RowError::ColorTooWide(slot.color));
                    }
                    out.push((b'0' + slot.color) as char);
                }
                None => out.push('0'),
            }
        }
    }
    Ok(out)
}

fn encode_slot_gimmick(state: &State) -> String {
    let mut out = String::new();
    for (i, bottle) in state.bottles.iter().enumerate() {
        if i > 0 {
            out.push('#');
        }
        for k in 0..bottle.capacity {
            let hidden = bottle.slots.get(k).is_some_and(|s| s.hidden);
            out.push(if hidden { '1' } else { '0' });
        }
    }
    out
}

fn encode_stack_gimmick(state: &State) -> String {
    let mut out = String::new();
    for (i, bottle) in state.bottles.iter().enumerate() {
        if i > 0 {
            out.push('#');
        }
        let g = bottle.gimmick;
        let param = if g.kind == GimmickKind::Cloth {
            g.cloth_target
        } else {
            0
        };
        out.push_str(&format!("{}_{}", g.kind.code(), param));
    }
    out
}

/// Rebuild a state from a row. Unparseable gimmick tokens are skipped, and
/// `0` digits in the map are padding rather than slots.
pub fn decode(row: &CsvRow) -> State {
    let params = Params::new(row.number_of_item, row.number_of_stack, row.number_of_slot);
    let mut state = State {
        params,
        bottles: (0..params.num_bottles)
            .map(|_| Bottle::empty(params.capacity))
            .collect(),
        locks: Locks::default(),
    };

    for (i, token) in row.map.split('#').enumerate() {
        if i >= state.bottles.len() {
            break;
        }
        let bottle = &mut state.bottles[i];
        for ch in token.chars() {
            if !ch.is_ascii_digit() {
                continue;
            }
            let color = ch as u8 - b'0';
            if color == 0 {
                continue;
            }
            if bottle.slots.len() >= bottle.capacity {
                break;
            }
            bottle.slots.push(Slot::visible(color));
        }
    }

    for (i, mask) in row.slot_gimmick.split('#').enumerate() {
        if i >= state.bottles.len() {
            break;
        }
        let bottle = &mut state.bottles[i];
        for (k, ch) in mask.chars().enumerate() {
            if k >= bottle.slots.len() {
                break;
            }
            if ch == '1' {
                bottle.slots[k].hidden = true;
            }
        }
    }

    for (i, token) in row.stack_gimmick.split('#').enumerate() {
        if i >= state.bottles.len() {
            break;
        }
        let mut parts = token.split('_');
        let (Some(kind), Some(param), None) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        let (Ok(kind), Ok(param)) = (kind.parse::<u8>(), param.parse::<Color>()) else {
            continue;
        };
        if let Some(kind) = GimmickKind::from_code(kind) {
            state.bottles[i].gimmick = Gimmick {
                kind,
                cloth_target: param,
            };
        }
    }

    state.refresh_locks();
    state
}

/// Write rows, with a header unless appending to an existing file.
pub fn save(path: &Path, rows: &[CsvRow], append: bool) -> io::Result<()> {
    let exists = path.exists();
    let mut file = if append {
        fs::OpenOptions::new().create(true).append(true).open(path)?
    } else {
        fs::File::create(path)?
    };
    if !exists || !append {
        writeln!(file, "{HEADER}")?;
    }
    for r in rows {
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{},{}",
            r.index,
            r.map,
            r.slot_gimmick,
            r.stack_gimmick,
            r.number_of_item,
            r.number_of_slot,
            r.number_of_stack,
            r.mix_count,
            r.min_moves,
            r.difficulty_score,
            r.difficulty_label,
        )?;
    }
    Ok(())
}

/// Read rows back; the header and malformed lines are skipped.
pub fn load(path: &Path) -> io::Result<Vec<CsvRow>> {
    let text = fs::read_to_string(path)?;
    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if i == 0 || line.is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split(',').collect();
        if cells.len() < 11 {
            continue;
        }
        let parsed = (
            cells[0].parse::<usize>(),
            cells[4].parse::<usize>(),
            cells[5].parse::<usize>(),
            cells[6].parse::<usize>(),
            cells[7].parse::<usize>(),
            cells[8].parse::<u32>(),
            cells[9].parse::<f64>(),
        );
        let (Ok(index), Ok(item), Ok(slot), Ok(stack), Ok(mix), Ok(min_moves), Ok(score)) = parsed
        else {
            continue;
        };
        out.push(CsvRow {
            index,
            map: cells[1].to_string(),
            slot_gimmick: cells[2].to_string(),
            stack_gimmick: cells[3].to_string(),
            number_of_item: item,
            number_of_slot: slot,
            number_of_stack: stack,
            mix_count: mix,
            min_moves,
            difficulty_score: score,
            difficulty_label: cells[10].to_string(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use watersort_core::{GenOptions, Generator};

    fn generate_one(seed: u64) -> Generated {
        let params = Params::new(4, 6, 4);
        let opt = GenOptions {
            seed,
            solve_time_ms: 4000,
            ..GenOptions::default()
        };
        Generator::new(params, opt)
            .make_one(None)
            .expect("generation failed")
    }

    #[test]
    fn encode_decode_round_trips_contents() {
        let g = generate_one(11);
        let row = encode(0, &g).expect("encode failed");
        assert_eq!(row.number_of_stack, 6);
        assert_eq!(row.map.matches('#').count(), 5);

        let decoded = decode(&row);
        assert_eq!(decoded.params, g.state.params);
        for (a, b) in decoded.bottles.iter().zip(&g.state.bottles) {
            assert_eq!(a.slots, b.slots);
            assert_eq!(a.gimmick, b.gimmick);
        }
    }

    #[test]
    fn hidden_flags_survive_the_round_trip() {
        let mut g = generate_one(12);
        // Mark a couple of below-top slots hidden.
        for bottle in g.state.bottles.iter_mut().take(2) {
            if bottle.slots.len() >= 2 {
                bottle.slots[0].hidden = true;
            }
        }
        let row = encode(0, &g).expect("encode failed");
        let decoded = decode(&row);
        for (a, b) in decoded.bottles.iter().zip(&g.state.bottles) {
            let a_hidden: Vec<bool> = a.slots.iter().map(|s| s.hidden).collect();
            let b_hidden: Vec<bool> = b.slots.iter().map(|s| s.hidden).collect();
            assert_eq!(a_hidden, b_hidden);
        }
    }

    #[test]
    fn wide_colors_are_refused_not_truncated() {
        let mut g = generate_one(13);
        g.state.bottles[0].slots[0].color = 12;
        let err = encode(0, &g).expect_err("colors above 9 must fail");
        assert_eq!(err, RowError::ColorTooWide(12));
    }

    #[test]
    fn save_and_load_with_append() {
        let g = generate_one(14);
        let row0 = encode(0, &g).expect("encode failed");
        let row1 = encode(1, &g).expect("encode failed");

        let path = std::env::temp_dir().join(format!(
            "watersort-rows-{}-{:x}.csv",
            std::process::id(),
            g.state.content_hash()
        ));
        save(&path, &[row0.clone()], false).expect("save failed");
        save(&path, &[row1.clone()], true).expect("append failed");

        let loaded = load(&path).expect("load failed");
        let _ = fs::remove_file(&path);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], row0);
        assert_eq!(loaded[1].index, 1);
        assert_eq!(loaded[1].map, row1.map);
    }
}
