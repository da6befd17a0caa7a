//! VCD parsing: the full header+body reader and the restricted quick-times scan.

use std::collections::HashMap;
use std::io::BufRead;

use wan_core::{ScopeKind, SignalIdx, SignalKind, Waveform};

use crate::error::VcdError;

/// Parses a timescale body like `"1ns"`, `"100 ps"` into a signed base-10 exponent.
pub(crate) fn parse_timescale(body: &str, line: usize) -> Result<i8, VcdError> {
    let s = body.trim();
    let digit_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (num_str, unit_str) = s.split_at(digit_end);
    let mantissa: u32 = num_str.parse().map_err(|_| VcdError::BadTimescale {
        line,
        text: body.to_string(),
    })?;
    let unit = unit_str.trim().to_lowercase();
    let exponent = match (unit.as_str(), mantissa) {
        ("s", 1) => 0,
        ("s", 10) => 1,
        ("s", 100) => 2,
        ("s", 1000) => 3,
        ("ms", 100) => -1,
        ("ms", 10) => -2,
        ("ms", 1) => -3,
        ("us", 100) => -4,
        ("us", 10) => -5,
        ("us", 1) => -6,
        ("ns", 100) => -7,
        ("ns", 10) => -8,
        ("ns", 1) => -9,
        ("ps", 100) => -10,
        ("ps", 10) => -11,
        ("ps", 1) => -12,
        ("fs", 100) => -13,
        ("fs", 10) => -14,
        ("fs", 1) => -15,
        _ => {
            return Err(VcdError::BadTimescale {
                line,
                text: body.to_string(),
            })
        }
    };
    Ok(exponent)
}

fn scope_kind_from_str(s: &str, line: usize, text: &str) -> Result<ScopeKind, VcdError> {
    match s {
        "module" => Ok(ScopeKind::Module),
        "task" => Ok(ScopeKind::Task),
        "function" => Ok(ScopeKind::Function),
        "block" | "begin" | "fork" => Ok(ScopeKind::Block),
        _ => Err(VcdError::BadValueLine {
            line,
            text: text.to_string(),
        }),
    }
}

fn signal_kind_from_str(s: &str, line: usize, text: &str) -> Result<SignalKind, VcdError> {
    match s {
        "reg" => Ok(SignalKind::Register),
        "wire" => Ok(SignalKind::Wire),
        "integer" => Ok(SignalKind::Integer),
        _ => Err(VcdError::BadValueLine {
            line,
            text: text.to_string(),
        }),
    }
}

struct Reader {
    waveform: Waveform,
    scope_path: Vec<String>,
    id_to_idx: HashMap<String, SignalIdx>,
    current_time: u64,
    have_time: bool,
    seen_first_dumpvars: bool,
}

impl Reader {
    fn new() -> Self {
        Self {
            waveform: Waveform::new(),
            scope_path: Vec::new(),
            id_to_idx: HashMap::new(),
            current_time: 0,
            have_time: false,
            seen_first_dumpvars: false,
        }
    }

    fn current_full_name(&self) -> String {
        self.scope_path.last().cloned().unwrap_or_default()
    }

    fn enter_scope(&mut self, kind: ScopeKind, name: &str) {
        let parent = self.current_full_name();
        {
            let parent_scope = self
                .waveform
                .root_mut()
                .find_scope_mut(&parent)
                .expect("parent scope exists");
            parent_scope.add_scope(name, kind);
        }
        let full = if parent.is_empty() {
            name.to_string()
        } else {
            format!("{parent}.{name}")
        };
        self.scope_path.push(full);
    }

    fn leave_scope(&mut self) {
        self.scope_path.pop();
    }

    fn declare_var(
        &mut self,
        kind: SignalKind,
        width: u32,
        id: &str,
        name: &str,
    ) -> Result<(), VcdError> {
        let scope = self.current_full_name();
        if let Some(&existing) = self.id_to_idx.get(id) {
            match kind {
                SignalKind::Register => self.waveform.add_register_alias(&scope, name, width, existing),
                SignalKind::Wire => self.waveform.add_wire_alias(&scope, name, width, existing),
                SignalKind::Integer => self.waveform.add_integer_alias(&scope, name, width, existing),
            }
            .map_err(VcdError::from)?;
        } else {
            let idx = match kind {
                SignalKind::Register => self.waveform.add_register(&scope, name, width),
                SignalKind::Wire => self.waveform.add_wire(&scope, name, width),
                SignalKind::Integer => self.waveform.add_integer(&scope, name, width),
            }
            .map_err(VcdError::from)?;
            self.id_to_idx.insert(id.to_string(), idx);
        }
        Ok(())
    }

    fn header_keyword(&mut self, keyword: &str, body: &str, line: usize) -> Result<bool, VcdError> {
        match keyword {
            "date" => self.waveform.set_date(body.trim()),
            "version" => self.waveform.set_version(body.trim()),
            "comment" => self.waveform.set_comment(body.trim()),
            "timescale" => {
                let exp = parse_timescale(body, line)?;
                self.waveform.set_time_scale(exp);
            }
            "scope" => {
                let parts: Vec<&str> = body.split_whitespace().collect();
                if parts.len() < 2 {
                    return Err(VcdError::BadValueLine {
                        line,
                        text: body.to_string(),
                    });
                }
                let kind = scope_kind_from_str(parts[0], line, body)?;
                self.enter_scope(kind, parts[1]);
            }
            "upscope" => self.leave_scope(),
            "var" => {
                let parts: Vec<&str> = body.split_whitespace().collect();
                if parts.len() < 4 {
                    return Err(VcdError::BadValueLine {
                        line,
                        text: body.to_string(),
                    });
                }
                let kind = signal_kind_from_str(parts[0], line, body)?;
                let width: u32 = parts[1].parse().map_err(|_| VcdError::BadValueLine {
                    line,
                    text: body.to_string(),
                })?;
                self.declare_var(kind, width, parts[2], parts[3])?;
            }
            "enddefinitions" => return Ok(true),
            _ => {
                return Err(VcdError::UnexpectedKeyword {
                    line,
                    keyword: keyword.to_string(),
                })
            }
        }
        Ok(false)
    }

    fn apply_time(&mut self, t: u64, line: usize) -> Result<(), VcdError> {
        if self.have_time && t < self.current_time {
            return Err(VcdError::NonMonotonicTime {
                line,
                time: t,
                last: self.current_time,
            });
        }
        self.current_time = t;
        self.have_time = true;
        self.waveform.set_end_time(t);
        Ok(())
    }

    fn apply_value_line(&mut self, line_text: &str, line: usize) -> Result<(), VcdError> {
        let bytes = line_text.as_bytes();
        if bytes.is_empty() {
            return Ok(());
        }
        if bytes[0] == b'b' || bytes[0] == b'B' {
            let rest = &line_text[1..];
            let mut parts = rest.split_whitespace();
            let bits = parts.next().ok_or_else(|| VcdError::BadValueLine {
                line,
                text: line_text.to_string(),
            })?;
            let id = parts.next().ok_or_else(|| VcdError::BadValueLine {
                line,
                text: line_text.to_string(),
            })?;
            let idx = *self
                .id_to_idx
                .get(id)
                .ok_or_else(|| VcdError::UnknownSignalId {
                    line,
                    id: id.to_string(),
                })?;
            self.waveform
                .add_value_change_str(idx, self.current_time, bits)?;
        } else {
            let first = line_text.chars().next().unwrap();
            match first {
                '0' | '1' | 'x' | 'X' | 'z' | 'Z' => {
                    let id = &line_text[1..];
                    let idx = *self
                        .id_to_idx
                        .get(id)
                        .ok_or_else(|| VcdError::UnknownSignalId {
                            line,
                            id: id.to_string(),
                        })?;
                    self.waveform
                        .add_value_change_str(idx, self.current_time, &first.to_string())?;
                }
                _ => {
                    // real values and other extensions are out of scope.
                }
            }
        }
        Ok(())
    }
}

/// Parses a complete VCD stream into a fresh [`Waveform`].
pub fn read_vcd<R: BufRead>(reader: R) -> Result<Waveform, VcdError> {
    let mut state = Reader::new();
    let mut in_header = true;
    let mut pending: Option<(String, usize)> = None;
    let mut pending_body = String::new();

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line_num = line_no + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some((keyword, start_line)) = pending.clone() {
            if let Some(pos) = trimmed.find("$end") {
                pending_body.push(' ');
                pending_body.push_str(trimmed[..pos].trim());
                let done = state.header_keyword(&keyword, pending_body.trim(), start_line)?;
                pending = None;
                pending_body.clear();
                if done {
                    in_header = false;
                }
            } else {
                pending_body.push(' ');
                pending_body.push_str(trimmed);
            }
            continue;
        }

        if in_header {
            if let Some(rest) = trimmed.strip_prefix('$') {
                let end = rest
                    .find(|c: char| c.is_whitespace())
                    .unwrap_or(rest.len());
                let keyword = rest[..end].to_lowercase();
                let after = rest[end..].trim();
                if let Some(pos) = after.find("$end") {
                    let body = after[..pos].trim();
                    let done = state.header_keyword(&keyword, body, line_num)?;
                    if done {
                        in_header = false;
                    }
                } else {
                    pending = Some((keyword, line_num));
                    pending_body = after.to_string();
                }
            } else {
                return Err(VcdError::UnexpectedKeyword {
                    line: line_num,
                    keyword: trimmed.to_string(),
                });
            }
            continue;
        }

        // BODY / DUMP_SECTION
        if trimmed == "$dumpvars"
            || trimmed == "$dumpall"
            || trimmed == "$dumpoff"
            || trimmed == "$dumpon"
        {
            if !state.seen_first_dumpvars && trimmed == "$dumpvars" {
                state.waveform.set_start_time(state.current_time);
                state.seen_first_dumpvars = true;
            }
            continue;
        }
        if trimmed == "$end" {
            continue;
        }
        if let Some(time_str) = trimmed.strip_prefix('#') {
            let t: u64 = time_str
                .trim()
                .parse()
                .map_err(|_| VcdError::BadTimeMarker {
                    line: line_num,
                    text: trimmed.to_string(),
                })?;
            state.apply_time(t, line_num)?;
            continue;
        }
        state.apply_value_line(trimmed, line_num)?;
    }

    if pending.is_some() {
        return Err(VcdError::MissingEnd {
            line: pending.unwrap().1,
        });
    }

    Ok(state.waveform)
}

/// Reads only the `$timescale` exponent and the sorted, deduplicated set of
/// `#<time>` markers, discarding everything else. The single required input
/// to a merge (see `wan_merge`).
pub fn quick_times<R: BufRead>(reader: R) -> Result<(i8, Vec<u64>), VcdError> {
    let mut exponent: i8 = 0;
    let mut times = Vec::new();
    let mut pending_timescale: Option<usize> = None;
    let mut pending_body = String::new();

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line_num = line_no + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(start_line) = pending_timescale {
            if let Some(pos) = trimmed.find("$end") {
                pending_body.push(' ');
                pending_body.push_str(trimmed[..pos].trim());
                exponent = parse_timescale(pending_body.trim(), start_line)?;
                pending_timescale = None;
                pending_body.clear();
            } else {
                pending_body.push(' ');
                pending_body.push_str(trimmed);
            }
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("$timescale") {
            let after = rest.trim();
            if let Some(pos) = after.find("$end") {
                exponent = parse_timescale(after[..pos].trim(), line_num)?;
            } else {
                pending_timescale = Some(line_num);
                pending_body = after.to_string();
            }
            continue;
        }

        if let Some(time_str) = trimmed.strip_prefix('#') {
            let t: u64 = time_str
                .trim()
                .parse()
                .map_err(|_| VcdError::BadTimeMarker {
                    line: line_num,
                    text: trimmed.to_string(),
                })?;
            if times.last() != Some(&t) {
                times.push(t);
            }
        }
    }

    times.sort_unstable();
    times.dedup();
    Ok((exponent, times))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn minimal_vcd() -> &'static str {
        "\
$date
  today
$end
$version
  test writer
$end
$timescale
  1fs
$end
$scope module top $end
$var wire 1 ! clk $end
$upscope $end
$enddefinitions $end
$dumpvars
0!
$end
#1000
1!
#2000
0!
"
    }

    #[test]
    fn reads_minimal_header_and_body() {
        let wf = read_vcd(Cursor::new(minimal_vcd())).unwrap();
        assert_eq!(wf.date(), "today");
        assert_eq!(wf.version(), "test writer");
        assert_eq!(wf.time_scale(), -15);
        assert_eq!(wf.signal_count(), 1);
        let desc = wf.find_signal_desc("top", "clk").unwrap();
        let sig = wf.signal(desc.idx);
        assert_eq!(sig.len(), 3);
        assert_eq!(wf.start_time(), 0);
        assert_eq!(wf.end_time(), 2000);
    }

    #[test]
    fn unknown_header_keyword_fails() {
        let vcd = "$bogus foo $end\n$enddefinitions $end\n";
        let err = read_vcd(Cursor::new(vcd)).unwrap_err();
        assert!(matches!(err, VcdError::UnexpectedKeyword { .. }));
    }

    #[test]
    fn unknown_signal_id_fails() {
        let vcd = "\
$timescale 1fs $end
$scope module top $end
$var wire 1 ! clk $end
$upscope $end
$enddefinitions $end
#0
1\"
";
        let err = read_vcd(Cursor::new(vcd)).unwrap_err();
        assert!(matches!(err, VcdError::UnknownSignalId { .. }));
    }

    #[test]
    fn non_monotonic_time_fails() {
        let vcd = "\
$timescale 1fs $end
$scope module top $end
$var wire 1 ! clk $end
$upscope $end
$enddefinitions $end
#10
0!
#5
1!
";
        let err = read_vcd(Cursor::new(vcd)).unwrap_err();
        assert!(matches!(err, VcdError::NonMonotonicTime { .. }));
    }

    #[test]
    fn alias_shares_signal() {
        let vcd = "\
$timescale 1fs $end
$scope module top $end
$var wire 1 ! w1 $end
$var wire 1 ! w1_alias $end
$upscope $end
$enddefinitions $end
#0
1!
";
        let wf = read_vcd(Cursor::new(vcd)).unwrap();
        assert_eq!(wf.signal_count(), 1);
        let a = wf.find_signal_desc("top", "w1").unwrap();
        let b = wf.find_signal_desc("top", "w1_alias").unwrap();
        assert_eq!(a.idx, b.idx);
        assert!(b.alias);
    }

    #[test]
    fn bus_value_parses_multi_bit() {
        let vcd = "\
$timescale 1fs $end
$scope module top $end
$var wire 4 ! data $end
$upscope $end
$enddefinitions $end
#0
b1010 !
";
        let wf = read_vcd(Cursor::new(vcd)).unwrap();
        let desc = wf.find_signal_desc("top", "data").unwrap();
        let sig = wf.signal(desc.idx);
        assert_eq!(sig.value_at_change(0).to_string(), "1010");
    }

    #[test]
    fn quick_times_scan_collects_sorted_distinct_times() {
        let vcd = "\
$timescale 10ps $end
$scope module top $end
$var wire 1 ! sig $end
$upscope $end
$enddefinitions $end
#0
0!
#0
1!
#5
0!
#5000
1!
";
        let (exponent, times) = quick_times(Cursor::new(vcd)).unwrap();
        assert_eq!(exponent, -11);
        assert_eq!(times, vec![0, 5, 5000]);
    }

    #[test]
    fn scope_kinds_mapped() {
        let vcd = "\
$timescale 1fs $end
$scope task tb_task $end
$upscope $end
$scope function tb_fn $end
$upscope $end
$scope block tb_blk $end
$upscope $end
$enddefinitions $end
";
        let wf = read_vcd(Cursor::new(vcd)).unwrap();
        assert_eq!(wf.root().find_scope("tb_task").unwrap().kind, ScopeKind::Task);
        assert_eq!(
            wf.root().find_scope("tb_fn").unwrap().kind,
            ScopeKind::Function
        );
        assert_eq!(
            wf.root().find_scope("tb_blk").unwrap().kind,
            ScopeKind::Block
        );
    }
}
