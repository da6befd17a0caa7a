//! VCD serialization: a depth-first scope/variable declaration pass followed
//! by a time-ordered value-change body.

use std::collections::HashMap;
use std::io::{self, Write};

use wan_core::{visit, Scope, ScopeKind, SignalDesc, SignalIdx, SignalKind, VisitOptions, Visitor, Waveform};

use crate::error::VcdError;

fn make_id_code(index: u32) -> String {
    let mut result = String::new();
    let mut idx = index;
    loop {
        let c = (b'!' + (idx % 94) as u8) as char;
        result.push(c);
        idx /= 94;
        if idx == 0 {
            break;
        }
        idx -= 1;
    }
    result
}

fn strip_and_lower(s: &str) -> String {
    let trimmed = s.trim_start_matches('0');
    let result = if trimmed.is_empty() { "0" } else { trimmed };
    result.to_lowercase()
}

fn scope_kind_word(kind: ScopeKind) -> &'static str {
    match kind {
        ScopeKind::Module => "module",
        ScopeKind::Task => "task",
        ScopeKind::Function => "function",
        ScopeKind::Block => "begin",
    }
}

fn signal_kind_word(kind: SignalKind) -> &'static str {
    match kind {
        SignalKind::Register => "reg",
        SignalKind::Wire => "wire",
        SignalKind::Integer => "integer",
    }
}

struct ScopeWriter<'a, W: Write> {
    out: W,
    waveform: &'a Waveform,
    ids: HashMap<SignalIdx, String>,
    next_id: u32,
    err: Option<io::Error>,
}

impl<'a, W: Write> ScopeWriter<'a, W> {
    fn id_for(&mut self, idx: SignalIdx) -> String {
        if let Some(existing) = self.ids.get(&idx) {
            return existing.clone();
        }
        let code = make_id_code(self.next_id);
        self.next_id += 1;
        self.ids.insert(idx, code.clone());
        code
    }

    fn fail_if_ok(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            if self.err.is_none() {
                self.err = Some(e);
            }
        }
    }
}

impl<'a, W: Write> Visitor for ScopeWriter<'a, W> {
    fn enter_scope(&mut self, scope: &Scope) {
        if self.err.is_some() {
            return;
        }
        let line = format!(
            "$scope {} {} $end",
            scope_kind_word(scope.kind),
            scope.instance_name
        );
        let r = writeln!(self.out, "{line}");
        self.fail_if_ok(r);
    }

    fn leave_scope(&mut self) {
        if self.err.is_some() {
            return;
        }
        let r = writeln!(self.out, "$upscope $end");
        self.fail_if_ok(r);
    }

    fn visit_signal(&mut self, _full_scope_name: &str, desc: &SignalDesc) {
        if self.err.is_some() {
            return;
        }
        let width = self.waveform.signal(desc.idx).width();
        let id = self.id_for(desc.idx);
        let r = writeln!(
            self.out,
            "$var {} {} {} {} $end",
            signal_kind_word(desc.kind),
            width,
            id,
            desc.name
        );
        self.fail_if_ok(r);
    }
}

/// Writes a complete VCD stream for `waveform`.
///
/// Sections are emitted in the fixed order `$date`, `$comment`, `$version`
/// (each only if non-empty), `$timescale`, a depth-first declaration pass
/// over the scope tree, then the value-change body: a `#<start_time>`
/// `$dumpvars` block with one line per signal's first change, followed by
/// monotone time-steps each carrying only the signals that changed at that
/// instant.
///
/// Assumes every signal has a change recorded at `start_time`; this matches
/// the source library's own assumption rather than padding undeclared
/// signals with `X`.
pub fn write_vcd<W: Write>(waveform: &Waveform, mut out: W) -> Result<(), VcdError> {
    if !waveform.date().is_empty() {
        writeln!(out, "$date")?;
        writeln!(out, "  {}", waveform.date())?;
        writeln!(out, "$end")?;
    }
    if !waveform.comment().is_empty() {
        writeln!(out, "$comment")?;
        writeln!(out, "  {}", waveform.comment())?;
        writeln!(out, "$end")?;
    }
    if !waveform.version().is_empty() {
        writeln!(out, "$version")?;
        writeln!(out, "  {}", waveform.version())?;
        writeln!(out, "$end")?;
    }
    writeln!(out, "$timescale")?;
    writeln!(out, "  {}", waveform.get_time_scale())?;
    writeln!(out, "$end")?;

    let mut scope_writer = ScopeWriter {
        out,
        waveform,
        ids: HashMap::new(),
        next_id: 0,
        err: None,
    };
    visit(waveform.root(), &mut scope_writer, &VisitOptions::visit_all());
    if let Some(e) = scope_writer.err {
        return Err(VcdError::Io(e));
    }
    let ids = scope_writer.ids;
    let mut out = scope_writer.out;

    writeln!(out, "$enddefinitions $end")?;
    write_body(waveform, &mut out, &ids)?;
    Ok(())
}

fn write_body<W: Write>(
    waveform: &Waveform,
    out: &mut W,
    ids: &HashMap<SignalIdx, String>,
) -> Result<(), VcdError> {
    let all_times = waveform.all_times();
    let mut by_time_idx: Vec<Vec<(SignalIdx, u32)>> = vec![Vec::new(); all_times.len()];
    for (idx, sig) in waveform.signals() {
        for k in 0..sig.len() {
            by_time_idx[sig.time_idx_at_change(k) as usize].push((idx, k as u32));
        }
    }

    for (t_idx, changes) in by_time_idx.iter().enumerate() {
        if changes.is_empty() {
            continue;
        }
        writeln!(out, "#{}", all_times[t_idx])?;
        if t_idx == 0 {
            writeln!(out, "$dumpvars")?;
        }
        for &(idx, k) in changes {
            let sig = waveform.signal(idx);
            let width = sig.width();
            let value = sig.value_at_change(k as usize);
            let id = ids.get(&idx).expect("every declared signal has an id");
            let stripped = strip_and_lower(&value.to_string());
            if width == 1 {
                writeln!(out, "{stripped}{id}")?;
            } else {
                writeln!(out, "b{stripped} {id}")?;
            }
        }
        if t_idx == 0 {
            writeln!(out, "$end")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wan_common::LogicValue;

    fn bv(width: u32, bits: &str) -> wan_common::BitVector {
        let mut v = wan_common::BitVector::new(width);
        for (i, c) in bits.chars().rev().enumerate() {
            v.set(i as u32, LogicValue::from_char(c).unwrap()).unwrap();
        }
        v
    }

    #[test]
    fn scenario_s2_minimal_write() {
        let mut w = Waveform::new();
        w.add_module("test");
        let idx = w.add_wire("test", "a_signal", 4).unwrap();
        w.add_value_change(idx, 0, &bv(4, "0000")).unwrap();
        w.add_value_change(idx, 5, &bv(4, "0010")).unwrap();
        w.add_value_change(idx, 10, &bv(4, "1010")).unwrap();
        w.add_value_change_str(idx, 15, "100").unwrap();
        w.add_value_change_str(idx, 20, "1").unwrap();

        let mut buf = Vec::new();
        write_vcd(&w, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let body: Vec<&str> = text
            .lines()
            .skip_while(|l| *l != "$enddefinitions $end")
            .skip(1)
            .collect();
        assert_eq!(
            body,
            vec![
                "#0", "$dumpvars", "b0 !", "$end", "#5", "b10 !", "#10", "b1010 !", "#15",
                "b100 !", "#20", "b1 !",
            ]
        );
    }

    #[test]
    fn header_sections_emitted_only_when_non_empty() {
        let mut w = Waveform::new();
        w.set_version("v1");
        let mut buf = Vec::new();
        write_vcd(&w, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("$version"));
        assert!(!text.contains("$date"));
        assert!(!text.contains("$comment"));
    }

    #[test]
    fn aliases_share_id_code() {
        let mut w = Waveform::new();
        w.add_module("top");
        let idx = w.add_wire("top", "w1", 1).unwrap();
        w.add_value_change_str(idx, 0, "1").unwrap();
        w.add_wire_alias("top", "w1_alias", 1, idx).unwrap();

        let mut buf = Vec::new();
        write_vcd(&w, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("$var wire 1 ! w1 $end"));
        assert!(text.contains("$var wire 1 ! w1_alias $end"));
    }

    #[test]
    fn id_codes_roll_over_past_94() {
        assert_eq!(make_id_code(0), "!");
        assert_eq!(make_id_code(93), "~");
        assert_eq!(make_id_code(94).len(), 2);
    }

    #[test]
    fn strip_and_lower_examples() {
        assert_eq!(strip_and_lower("00100"), "100");
        assert_eq!(strip_and_lower("00A"), "a");
        assert_eq!(strip_and_lower("0"), "0");
    }

    #[test]
    fn roundtrip_through_reader() {
        let mut w = Waveform::new();
        w.set_date("today");
        w.add_module("top");
        let idx = w.add_register("top", "q", 8).unwrap();
        w.add_value_change_str(idx, 0, "0").unwrap();
        w.add_value_change_str(idx, 7, "11110000").unwrap();

        let mut buf = Vec::new();
        write_vcd(&w, &mut buf).unwrap();
        let back = crate::reader::read_vcd(std::io::Cursor::new(&buf)).unwrap();

        assert_eq!(back.date(), "today");
        assert_eq!(back.signal_count(), 1);
        let desc = back.find_signal_desc("top", "q").unwrap();
        let sig = back.signal(desc.idx);
        assert_eq!(sig.len(), 2);
        assert_eq!(sig.value_at_change(1).to_string(), "11110000");
    }
}
