//! The canonical machine: modal state tracking plus block → canonical-op
//! translation, including arc decomposition (spec §4.2).

use crate::modal::{
    CoolantState, DistanceMode, FeedRateMode, ModalState, MotionMode, PathControlMode, Plane,
    SpindleState, Units,
};
use crate::ops::{CanonicalMove, ModalOp, SyncCommand};
use crate::parser::{check_modal_group_violations, normalize_line, tokenize, Word};
use crate::status::StatusCode;
use heapless::Vec;
use tinyg_hal::Axis;

#[cfg(feature = "std")]
mod mathf {
    pub fn sqrtf(x: f32) -> f32 {
        x.sqrt()
    }
    pub fn sinf(x: f32) -> f32 {
        x.sin()
    }
    pub fn cosf(x: f32) -> f32 {
        x.cos()
    }
    pub fn atan2f(y: f32, x: f32) -> f32 {
        y.atan2(x)
    }
}
#[cfg(not(feature = "std"))]
mod mathf {
    pub use libm::{atan2f, cosf, sinf, sqrtf};
}
use mathf::*;

const MM_PER_INCH: f32 = 25.4;
const TAU: f32 = core::f32::consts::PI * 2.0;

/// Maximum number of canonical emissions a single block can produce. Arc
/// decomposition dominates this: a full-circle arc at the default chord
/// length on a machine with a generous working envelope can emit a few
/// hundred chords.
pub const MAX_EMISSIONS: usize = 512;

/// Something the canonical machine hands to the planner or to the
/// scheduler's modal-state sink.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Emission {
    Modal(ModalOp),
    Move(CanonicalMove),
}

/// Tunables that in the real system live behind the out-of-scope
/// configuration surface (`ma` = arc segment length, per spec §6); they are
/// plain fields here rather than a config-store lookup.
#[derive(Debug, Copy, Clone)]
pub struct ArcParams {
    /// Target chord length, in millimeters.
    pub segment_len: f32,
    /// Re-anchor the incrementally-rotated chord start to the exact trig
    /// form every N chords, bounding accumulated rotation drift.
    pub correction_interval: u32,
}

impl Default for ArcParams {
    fn default() -> Self {
        Self {
            segment_len: 0.03,
            correction_interval: 64,
        }
    }
}

pub struct CanonicalMachine {
    pub modal: ModalState,
    pub arc_params: ArcParams,
}

impl Default for CanonicalMachine {
    fn default() -> Self {
        Self {
            modal: ModalState::default(),
            arc_params: ArcParams::default(),
        }
    }
}

impl CanonicalMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and execute one raw input line, per spec §4.2's evaluation
    /// order. Returns the canonical emissions to forward to the planner.
    /// On any input error, no emissions are produced and modal state is
    /// unchanged, except for the documented zero-length-move exception
    /// (spec §8 "Zero-length move → dropped, modal state still advances").
    pub fn process_line(&mut self, raw: &str) -> Result<Vec<Emission, MAX_EMISSIONS>, StatusCode> {
        let normalized = match normalize_line(raw) {
            Some(s) => s,
            None => return Ok(Vec::new()),
        };
        let words = tokenize(&normalized)?;
        check_modal_group_violations(&words)?;
        self.validate_supported_codes(&words)?;
        self.process_block(&words)
    }

    fn validate_supported_codes(&self, words: &[Word]) -> Result<(), StatusCode> {
        for w in words {
            match w.letter {
                'G' => {
                    let c = w.value;
                    let supported = [
                        0.0, 1.0, 2.0, 3.0, 4.0, 10.0, 17.0, 18.0, 19.0, 20.0, 21.0, 28.0, 53.0,
                        54.0, 55.0, 56.0, 57.0, 58.0, 59.0, 61.0, 61.1, 64.0, 80.0, 90.0, 91.0,
                        92.0, 93.0, 94.0,
                    ];
                    if !supported.iter().any(|&s| (s - c).abs() < 1e-4) {
                        return Err(StatusCode::UnsupportedStatement);
                    }
                }
                'M' => {
                    let c = w.value;
                    let supported = [0.0, 2.0, 3.0, 4.0, 5.0, 7.0, 8.0, 9.0, 30.0];
                    if !supported.iter().any(|&s| (s - c).abs() < 1e-4) {
                        return Err(StatusCode::UnsupportedStatement);
                    }
                }
                'X' | 'Y' | 'Z' | 'A' | 'I' | 'J' | 'K' | 'R' | 'F' | 'S' | 'T' | 'N' | 'P'
                | 'L' => {}
                _ => return Err(StatusCode::UnsupportedStatement),
            }
        }
        Ok(())
    }

    fn process_block(&mut self, words: &[Word]) -> Result<Vec<Emission, MAX_EMISSIONS>, StatusCode> {
        let mut out: Vec<Emission, MAX_EMISSIONS> = Vec::new();

        if let Some(n) = find(words, 'N') {
            self.modal.line_number = n as u32;
        }

        // Units-scaling uses the units mode in effect *before* this block's
        // own G20/G21 takes effect (spec §4.2 evaluation order: feed rate
        // before units).
        let scale = if self.modal.units == Units::Inches {
            MM_PER_INCH
        } else {
            1.0
        };

        // --- feed-rate mode ---
        if has_code(words, 'G', 93.0) {
            self.modal.feed_rate_mode = FeedRateMode::InverseTime;
            push(&mut out, Emission::Modal(ModalOp::SetFeedRateMode(self.modal.feed_rate_mode)))?;
        } else if has_code(words, 'G', 94.0) {
            self.modal.feed_rate_mode = FeedRateMode::UnitsPerMinute;
            push(&mut out, Emission::Modal(ModalOp::SetFeedRateMode(self.modal.feed_rate_mode)))?;
        }

        // --- feed rate ---
        if let Some(f) = find(words, 'F') {
            self.modal.feed_rate = f * scale;
        }

        // --- spindle speed ---
        if let Some(s) = find(words, 'S') {
            self.modal.spindle_speed = s;
        }

        // --- tool ---
        let mut tool_sync: Option<SyncCommand> = None;
        if let Some(t) = find(words, 'T') {
            self.modal.tool = t as u32;
            tool_sync = Some(SyncCommand::SetTool(self.modal.tool));
        }

        // --- tool-change --- (M6 not in the supported dialect; nothing to do)

        // --- spindle on/off ---
        let mut spindle_sync: Option<SyncCommand> = None;
        if has_code(words, 'M', 3.0) {
            self.modal.spindle = SpindleState::Clockwise;
            spindle_sync = Some(SyncCommand::SetSpindle {
                on: true,
                clockwise: true,
                speed: self.modal.spindle_speed,
            });
        } else if has_code(words, 'M', 4.0) {
            self.modal.spindle = SpindleState::CounterClockwise;
            spindle_sync = Some(SyncCommand::SetSpindle {
                on: true,
                clockwise: false,
                speed: self.modal.spindle_speed,
            });
        } else if has_code(words, 'M', 5.0) {
            self.modal.spindle = SpindleState::Off;
            spindle_sync = Some(SyncCommand::SetSpindle {
                on: false,
                clockwise: true,
                speed: 0.0,
            });
        }

        // --- coolant ---
        let mut coolant_sync: Vec<SyncCommand, 2> = Vec::new();
        if has_code(words, 'M', 7.0) {
            self.modal.coolant.mist = true;
            let _ = coolant_sync.push(SyncCommand::SetCoolantMist(true));
        }
        if has_code(words, 'M', 8.0) {
            self.modal.coolant.flood = true;
            let _ = coolant_sync.push(SyncCommand::SetCoolantFlood(true));
        }
        if has_code(words, 'M', 9.0) {
            self.modal.coolant = CoolantState::default();
            let _ = coolant_sync.push(SyncCommand::SetCoolantMist(false));
            let _ = coolant_sync.push(SyncCommand::SetCoolantFlood(false));
        }

        for sync in [tool_sync, spindle_sync]
            .into_iter()
            .flatten()
            .chain(coolant_sync.into_iter())
        {
            push(
                &mut out,
                Emission::Move(CanonicalMove::command_sync(
                    sync,
                    self.modal.work_position,
                    self.modal.line_number,
                )),
            )?;
        }

        // --- overrides --- (feed/speed override switches: out of scope, spec §1)

        // --- dwell ---
        if has_code(words, 'G', 4.0) {
            let seconds = find(words, 'P').unwrap_or(0.0);
            push(
                &mut out,
                Emission::Move(CanonicalMove::dwell(
                    seconds,
                    self.modal.work_position,
                    self.modal.line_number,
                )),
            )?;
        }

        // --- plane ---
        if has_code(words, 'G', 17.0) {
            self.modal.plane = Plane::Xy;
            push(&mut out, Emission::Modal(ModalOp::SetPlane(self.modal.plane)))?;
        } else if has_code(words, 'G', 18.0) {
            self.modal.plane = Plane::Xz;
            push(&mut out, Emission::Modal(ModalOp::SetPlane(self.modal.plane)))?;
        } else if has_code(words, 'G', 19.0) {
            self.modal.plane = Plane::Yz;
            push(&mut out, Emission::Modal(ModalOp::SetPlane(self.modal.plane)))?;
        }

        // --- units ---
        if has_code(words, 'G', 20.0) {
            self.modal.units = Units::Inches;
            push(&mut out, Emission::Modal(ModalOp::SetUnits(self.modal.units)))?;
        } else if has_code(words, 'G', 21.0) {
            self.modal.units = Units::Millimeters;
            push(&mut out, Emission::Modal(ModalOp::SetUnits(self.modal.units)))?;
        }

        // --- cutter compensation --- (not implemented, spec §4.2)

        // --- coordinate-system selection ---
        for (i, code) in [54.0, 55.0, 56.0, 57.0, 58.0, 59.0].into_iter().enumerate() {
            if has_code(words, 'G', code) {
                self.modal.active_coord_system = i;
                push(
                    &mut out,
                    Emission::Modal(ModalOp::SetCoordinateSystem(i)),
                )?;
            }
        }

        // --- path-control mode ---
        if has_code(words, 'G', 61.0) {
            self.modal.path_control = PathControlMode::ExactStop;
            push(&mut out, Emission::Modal(ModalOp::SetPathControl(self.modal.path_control)))?;
        } else if has_code(words, 'G', 61.1) {
            self.modal.path_control = PathControlMode::ExactPath;
            push(&mut out, Emission::Modal(ModalOp::SetPathControl(self.modal.path_control)))?;
        } else if has_code(words, 'G', 64.0) {
            self.modal.path_control = PathControlMode::Continuous;
            push(&mut out, Emission::Modal(ModalOp::SetPathControl(self.modal.path_control)))?;
        }

        // --- distance mode ---
        if has_code(words, 'G', 90.0) {
            self.modal.distance_mode = DistanceMode::Absolute;
            push(&mut out, Emission::Modal(ModalOp::SetDistanceMode(self.modal.distance_mode)))?;
        } else if has_code(words, 'G', 91.0) {
            self.modal.distance_mode = DistanceMode::Incremental;
            push(&mut out, Emission::Modal(ModalOp::SetDistanceMode(self.modal.distance_mode)))?;
        }

        // --- origin offsets (G92, G10) ---
        self.modal.one_shot_machine_coords = has_code(words, 'G', 53.0);
        if has_code(words, 'G', 92.0) {
            for axis in Axis::ALL {
                if let Some(v) = find(words, axis_letter(axis)) {
                    let i = axis.index();
                    let scaled = v * scale;
                    self.modal.origin_offsets[i] = self.modal.work_position[i]
                        - self.modal.coord_offsets[self.modal.active_coord_system][i]
                        - scaled;
                }
            }
            push(
                &mut out,
                Emission::Modal(ModalOp::SetOriginOffsets(self.modal.origin_offsets)),
            )?;
        }
        if has_code(words, 'G', 10.0) && find(words, 'L') == Some(2.0) {
            if let Some(p) = find(words, 'P') {
                let sys = (p as usize).saturating_sub(1).min(5);
                for axis in Axis::ALL {
                    if let Some(v) = find(words, axis_letter(axis)) {
                        self.modal.coord_offsets[sys][axis.index()] = v * scale;
                    }
                }
            }
        }

        // --- motion ---
        if has_code(words, 'G', 80.0) {
            self.modal.motion_mode = MotionMode::Cancelled;
        } else if has_code(words, 'G', 0.0) {
            self.modal.motion_mode = MotionMode::Seek;
        } else if has_code(words, 'G', 1.0) {
            self.modal.motion_mode = MotionMode::Feed;
        } else if has_code(words, 'G', 2.0) {
            self.modal.motion_mode = MotionMode::ArcCw;
        } else if has_code(words, 'G', 3.0) {
            self.modal.motion_mode = MotionMode::ArcCcw;
        }

        let has_axis_word = Axis::ALL.iter().any(|&a| find(words, axis_letter(a)).is_some());
        if has_axis_word {
            match self.modal.motion_mode {
                MotionMode::Seek => self.emit_linear(words, scale, true, &mut out)?,
                MotionMode::Feed => {
                    if self.modal.feed_rate_mode == FeedRateMode::UnitsPerMinute
                        && self.modal.feed_rate <= 0.0
                    {
                        return Err(StatusCode::MotionControlError);
                    }
                    self.emit_linear(words, scale, false, &mut out)?;
                }
                MotionMode::ArcCw | MotionMode::ArcCcw => {
                    self.emit_arc(words, scale, self.modal.motion_mode == MotionMode::ArcCw, &mut out)?;
                }
                MotionMode::Cancelled => {}
            }
        }

        // --- stop ---
        if has_code(words, 'M', 0.0) {
            push(&mut out, Emission::Modal(ModalOp::ProgramStop))?;
        } else if has_code(words, 'M', 2.0) || has_code(words, 'M', 30.0) {
            push(&mut out, Emission::Modal(ModalOp::ProgramEnd))?;
            self.modal = ModalState::default();
        }

        self.modal.one_shot_machine_coords = false;
        Ok(out)
    }

    fn emit_linear(
        &mut self,
        words: &[Word],
        scale: f32,
        is_seek: bool,
        out: &mut Vec<Emission, MAX_EMISSIONS>,
    ) -> Result<(), StatusCode> {
        let mut target = self.modal.work_position;
        for axis in Axis::ALL {
            if let Some(v) = find(words, axis_letter(axis)) {
                target[axis.index()] = self.modal.resolve_target(axis, v * scale);
            }
        }
        if target == self.modal.work_position {
            // Zero-length move: silently dropped, modal state still advances (spec §8).
            return Ok(());
        }
        let mv = if is_seek {
            CanonicalMove::seek(target, self.modal.line_number)
        } else {
            let feed_rate = self.effective_feed_rate(target);
            CanonicalMove::feed(target, feed_rate, self.modal.line_number)
        };
        self.modal.work_position = target;
        push(out, Emission::Move(mv))
    }

    /// In inverse-time mode the feed rate word means "1/minutes to complete
    /// this move", so the effective units/min feed rate depends on the
    /// move's length (spec §3 "feed-rate mode").
    fn effective_feed_rate(&self, target: [f32; 4]) -> f32 {
        match self.modal.feed_rate_mode {
            FeedRateMode::UnitsPerMinute => self.modal.feed_rate,
            FeedRateMode::InverseTime => {
                let mut dist_sq = 0.0f32;
                for i in 0..3 {
                    let d = target[i] - self.modal.work_position[i];
                    dist_sq += d * d;
                }
                let dist = sqrtf(dist_sq);
                if self.modal.feed_rate <= 0.0 {
                    0.0
                } else {
                    dist * self.modal.feed_rate
                }
            }
        }
    }

    fn emit_arc(
        &mut self,
        words: &[Word],
        scale: f32,
        clockwise: bool,
        out: &mut Vec<Emission, MAX_EMISSIONS>,
    ) -> Result<(), StatusCode> {
        let plane = self.modal.plane;
        let (u_axis, v_axis) = plane.in_plane_axes();
        let normal = plane.normal_axis();

        let start_u = self.modal.work_position[u_axis.index()];
        let start_v = self.modal.work_position[v_axis.index()];
        let start_n = self.modal.work_position[normal.index()];

        let mut end_u = start_u;
        let mut end_v = start_v;
        let mut end_n = start_n;
        if let Some(v) = find(words, axis_letter(u_axis)) {
            end_u = self.modal.resolve_target(u_axis, v * scale);
        }
        if let Some(v) = find(words, axis_letter(v_axis)) {
            end_v = self.modal.resolve_target(v_axis, v * scale);
        }
        if let Some(v) = find(words, axis_letter(normal)) {
            end_n = self.modal.resolve_target(normal, v * scale);
        }

        let (center_u, center_v, radius) = if let Some(r) = find(words, 'R') {
            let r = r * scale;
            if r.abs() < 1e-9 {
                return Err(StatusCode::ArcSpecificationError);
            }
            let (cu, cv) = arc_center_from_radius(start_u, start_v, end_u, end_v, r, clockwise)
                .ok_or(StatusCode::ArcSpecificationError)?;
            (cu, cv, r)
        } else {
            let i = find(words, 'I').unwrap_or(0.0) * scale;
            let j = find(words, 'J').unwrap_or(0.0) * scale;
            let (i, j) = match plane {
                Plane::Xy => (i, j),
                Plane::Xz => (i, find(words, 'K').unwrap_or(0.0) * scale),
                Plane::Yz => (find(words, 'J').unwrap_or(0.0) * scale, find(words, 'K').unwrap_or(0.0) * scale),
            };
            let cu = start_u + i;
            let cv = start_v + j;
            let r = sqrtf((start_u - cu) * (start_u - cu) + (start_v - cv) * (start_v - cv));
            (cu, cv, r)
        };

        if radius.abs() < 1e-9 {
            return Err(StatusCode::ArcSpecificationError);
        }

        let start_angle = atan2f(start_v - center_v, start_u - center_u);
        let mut end_angle = atan2f(end_v - center_v, end_u - center_u);

        let mut total_angle = if clockwise {
            start_angle - end_angle
        } else {
            end_angle - start_angle
        };
        while total_angle <= 0.0 {
            total_angle += TAU;
        }
        if total_angle.abs() < 1e-6 {
            return Err(StatusCode::ArcSpecificationError);
        }
        let _ = &mut end_angle;

        let arc_len = radius.abs() * total_angle;
        let chord_count = (arc_len / self.arc_params.segment_len).ceil().max(1.0) as u32;
        let delta_theta = total_angle / chord_count as f32 * if clockwise { -1.0 } else { 1.0 };
        let feed_rate = self.effective_feed_rate([end_u, end_v, end_n, 0.0]);
        if self.modal.feed_rate_mode == FeedRateMode::UnitsPerMinute && feed_rate <= 0.0 {
            return Err(StatusCode::MotionControlError);
        }

        let mut u = start_u;
        let mut v = start_v;
        for chord in 1..=chord_count {
            let theta = if chord % self.arc_params.correction_interval == 0 || chord == chord_count {
                // Re-anchor to the exact trig form to bound incremental-rotation drift.
                start_angle + delta_theta * chord as f32
            } else {
                atan2f(v - center_v, u - center_u) + delta_theta
            };
            let (next_u, next_v) = if chord == chord_count {
                (end_u, end_v)
            } else {
                (
                    center_u + radius.abs() * cosf(theta),
                    center_v + radius.abs() * sinf(theta),
                )
            };
            let t = chord as f32 / chord_count as f32;
            let next_n = start_n + (end_n - start_n) * t;

            let mut target = self.modal.work_position;
            target[u_axis.index()] = next_u;
            target[v_axis.index()] = next_v;
            target[normal.index()] = next_n;

            push(
                out,
                Emission::Move(CanonicalMove::feed(target, feed_rate, self.modal.line_number)),
            )?;
            self.modal.work_position = target;
            u = next_u;
            v = next_v;
        }
        Ok(())
    }
}

fn arc_center_from_radius(
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    r: f32,
    clockwise: bool,
) -> Option<(f32, f32)> {
    let dx = x1 - x0;
    let dy = y1 - y0;
    let chord = sqrtf(dx * dx + dy * dy);
    if chord < 1e-9 || chord > 2.0 * r.abs() + 1e-6 {
        return None;
    }
    let mid_x = (x0 + x1) * 0.5;
    let mid_y = (y0 + y1) * 0.5;
    let h_sq = r * r - (chord * chord) / 4.0;
    let h = if h_sq < 0.0 { 0.0 } else { sqrtf(h_sq) };
    // Perpendicular to the chord, unit length.
    let (perp_x, perp_y) = (-dy / chord, dx / chord);
    // Positive-radius convention picks the center on the side that makes the
    // arc the "short way" round; negative radius picks the long way. This
    // mirrors the RS-274 R-word convention.
    let sign = if (r > 0.0) == clockwise { 1.0 } else { -1.0 };
    Some((mid_x + sign * h * perp_x, mid_y + sign * h * perp_y))
}

fn axis_letter(axis: Axis) -> char {
    match axis {
        Axis::X => 'X',
        Axis::Y => 'Y',
        Axis::Z => 'Z',
        Axis::A => 'A',
    }
}

fn find(words: &[Word], letter: char) -> Option<f32> {
    words.iter().find(|w| w.letter == letter).map(|w| w.value)
}

fn has_code(words: &[Word], letter: char, code: f32) -> bool {
    words
        .iter()
        .any(|w| w.letter == letter && (w.value - code).abs() < 1e-4)
}

fn push(
    out: &mut Vec<Emission, MAX_EMISSIONS>,
    item: Emission,
) -> Result<(), StatusCode> {
    out.push(item).map_err(|_| StatusCode::BufferFull)
}
