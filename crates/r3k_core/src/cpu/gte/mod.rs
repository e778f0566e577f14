//! # Geometry Transformation Engine
//!
//! Coprocessor 2. A fixed point vector unit used to transform, project and light vertices. It
//! works on 16 bit values with 12 fractional bits, accumulating into 44 bit MAC registers before
//! the result is shifted and saturated into the 16 bit IR registers.
//!
//! Saturation and overflow never trap. They set bits in the flag register, which is cleared at
//! the start of every command.

mod math;
mod op;
mod regs;

use r3k_util::Bit;

use super::exception::Exception;
use math::{
    check_mac0_overflow, check_mac_overflow, divide, lim_a, lim_a_sf, lim_b, lim_c, lim_e,
    lim_xy, wrap_mac, Flags, SX_SAT, SY_SAT,
};
use regs::*;

pub use op::GteOp;
pub use regs::REGISTER_NAMES;

type Vec3 = [i64; 3];
type Matrix = [[i64; 3]; 3];

type Command = fn(&mut Gte, GteOp);

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Gte {
    regs: [u32; 64],
    flags: Flags,
}

impl Default for Gte {
    fn default() -> Self {
        Self { regs: [0; 64], flags: Flags::default() }
    }
}

#[inline]
fn low(val: u32) -> i64 {
    i64::from(val as i16)
}

#[inline]
fn high(val: u32) -> i64 {
    i64::from((val >> 16) as i16)
}

/// `tr + mat * vec`. Overflow is checked after each term is accumulated, and the sum wraps to 44
/// bits before the next term is added.
fn mat_mul_add(flags: &mut Flags, mat: &Matrix, vec: &Vec3, tr: &Vec3) -> Vec3 {
    let mut out = *tr;
    for (row, sum) in out.iter_mut().enumerate() {
        for col in 0..3 {
            *sum += mat[row][col] * vec[col];
            check_mac_overflow(flags, row, *sum);
            *sum = wrap_mac(*sum);
        }
    }
    out
}

impl Gte {
    const COMMANDS: [Option<Command>; 64] = {
        let mut table: [Option<Command>; 64] = [None; 64];

        table[GteOp::RTPS as usize] = Some(Self::cmd_rtps as Command);
        table[GteOp::NCLIP as usize] = Some(Self::cmd_nclip as Command);
        table[GteOp::OP as usize] = Some(Self::cmd_op as Command);
        table[GteOp::DPCS as usize] = Some(Self::cmd_dpcs as Command);
        table[GteOp::INTPL as usize] = Some(Self::cmd_intpl as Command);
        table[GteOp::MVMVA as usize] = Some(Self::cmd_mvmva as Command);
        table[GteOp::NCDS as usize] = Some(Self::cmd_ncds as Command);
        table[GteOp::CDP as usize] = Some(Self::cmd_cdp as Command);
        table[GteOp::NCDT as usize] = Some(Self::cmd_ncdt as Command);
        table[GteOp::NCCS as usize] = Some(Self::cmd_nccs as Command);
        table[GteOp::CC as usize] = Some(Self::cmd_cc as Command);
        table[GteOp::NCS as usize] = Some(Self::cmd_ncs as Command);
        table[GteOp::NCT as usize] = Some(Self::cmd_nct as Command);
        table[GteOp::SQR as usize] = Some(Self::cmd_sqr as Command);
        table[GteOp::DCPL as usize] = Some(Self::cmd_dcpl as Command);
        table[GteOp::DPCT as usize] = Some(Self::cmd_dpct as Command);
        table[GteOp::AVSZ3 as usize] = Some(Self::cmd_avsz3 as Command);
        table[GteOp::AVSZ4 as usize] = Some(Self::cmd_avsz4 as Command);
        table[GteOp::RTPT as usize] = Some(Self::cmd_rtpt as Command);
        table[GteOp::GPF as usize] = Some(Self::cmd_gpf as Command);
        table[GteOp::GPL as usize] = Some(Self::cmd_gpl as Command);
        table[GteOp::NCCT as usize] = Some(Self::cmd_ncct as Command);

        table
    };

    /// Run a command. Unknown command numbers raise a reserved instruction exception and leave
    /// all registers untouched.
    pub fn exec(&mut self, op: GteOp) -> Result<(), Exception> {
        let cmd = Self::COMMANDS[op.cmd() as usize].ok_or(Exception::ReservedInstruction)?;

        debug!("gte: {op}");

        self.flags.clear();
        cmd(self, op);

        Ok(())
    }

    /// All 64 registers as the guest would read them.
    pub fn registers(&self) -> [u32; 64] {
        let mut out = [0; 64];
        for (i, val) in out.iter_mut().enumerate() {
            *val = self.read(i);
        }
        out
    }

    /// The flag register, including the summary bit.
    pub fn flags(&self) -> u32 {
        self.flags.bits()
    }

    fn vector(&self, n: usize) -> Vec3 {
        let xy = self.regs[VXY0 + n * 2];
        [low(xy), high(xy), low(self.regs[VZ0 + n * 2])]
    }

    fn ir_vec(&self) -> Vec3 {
        [low(self.regs[IR1]), low(self.regs[IR1 + 1]), low(self.regs[IR1 + 2])]
    }

    fn ir0(&self) -> i64 {
        low(self.regs[IR0])
    }

    /// The components of RGBC, shifted left by `shift`.
    fn rgbc(&self, shift: u32) -> Vec3 {
        let rgbc = self.regs[RGBC];
        [0, 1, 2].map(|i| i64::from(rgbc.bit_range(i * 8, i * 8 + 7)) << shift)
    }

    /// A matrix of nine 16 bit values packed into five registers starting at `base`.
    fn matrix(&self, base: usize) -> Matrix {
        let mut mat = [[0; 3]; 3];
        for i in 0..9 {
            let word = self.regs[base + i / 2];
            mat[i / 3][i % 3] = if i % 2 == 0 { low(word) } else { high(word) };
        }
        mat
    }

    /// One of the 32 bit translation or color vectors, shifted to line up with matrix products.
    fn control_vec(&self, base: usize) -> Vec3 {
        [0, 1, 2].map(|i| i64::from(self.regs[base + i] as i32) << 12)
    }

    /// Set MAC1..3 to `vals` shifted by `sf` and IR1..3 to the saturated values.
    fn set_mac_ir(&mut self, vals: Vec3, sf: u32, lm: bool) {
        for (i, val) in vals.into_iter().enumerate() {
            check_mac_overflow(&mut self.flags, i, val);
            let mac = (val >> sf) as i32;
            self.regs[MAC1 + i] = mac as u32;
            self.set_ir(i, mac, lm);
        }
    }

    fn set_ir(&mut self, idx: usize, val: i32, lm: bool) {
        let ir = lim_a(&mut self.flags, idx, val, lm);
        self.regs[IR1 + idx] = i32::from(ir) as u32;
    }

    fn push_sz(&mut self, sz: u16) {
        for i in 0..3 {
            self.regs[SZ0 + i] = self.regs[SZ0 + i + 1];
        }
        self.regs[SZ0 + 3] = u32::from(sz);
    }

    /// Saturate MAC1..3 into a color and push it onto the color FIFO. The code byte is taken from
    /// RGBC.
    fn push_color(&mut self) {
        let mut color = self.regs[RGBC] & 0xff00_0000;
        for i in 0..3 {
            let mac = self.regs[MAC1 + i] as i32;
            let val = lim_b(&mut self.flags, i, mac >> 4);
            color |= u32::from(val) << (i * 8);
        }

        self.regs[RGB0] = self.regs[RGB0 + 1];
        self.regs[RGB0 + 1] = self.regs[RGB0 + 2];
        self.regs[RGB0 + 2] = color;
    }

    /// Rotate, translate and perspective transform vector `n`. The depth cue factor is only
    /// calculated when `last` is set.
    fn rtp(&mut self, n: usize, sf: u32, lm: bool, last: bool) {
        let (mat, vec, tr) = (self.matrix(RT), self.vector(n), self.control_vec(TR));
        let sums = mat_mul_add(&mut self.flags, &mat, &vec, &tr);

        for i in 0..2 {
            let mac = (sums[i] >> sf) as i32;
            self.regs[MAC1 + i] = mac as u32;
            self.set_ir(i, mac, lm);
        }

        self.regs[MAC1 + 2] = (sums[2] >> sf) as i32 as u32;
        let ir3 = lim_a_sf(&mut self.flags, sums[2], sf, lm);
        self.regs[IR1 + 2] = i32::from(ir3) as u32;

        let sz = lim_c(&mut self.flags, (sums[2] >> 12) as i32);
        self.push_sz(sz);

        let div = i64::from(divide(&mut self.flags, self.regs[H] as u16, sz));

        let ir = self.ir_vec();
        let sx = div * ir[0] + i64::from(self.regs[OFX] as i32);
        let sy = div * ir[1] + i64::from(self.regs[OFY] as i32);

        check_mac0_overflow(&mut self.flags, sx);
        check_mac0_overflow(&mut self.flags, sy);

        let x = lim_xy(&mut self.flags, SX_SAT, (sx >> 16) as i32);
        let y = lim_xy(&mut self.flags, SY_SAT, (sy >> 16) as i32);

        self.push_sxy(u32::from(x as u16) | u32::from(y as u16) << 16);

        if last {
            let p = div * low(self.regs[DQA]) + i64::from(self.regs[DQB] as i32);
            check_mac0_overflow(&mut self.flags, p);

            self.regs[MAC0] = p as i32 as u32;
            self.regs[IR0] = i32::from(lim_e(&mut self.flags, p >> 12)) as u32;
        }
    }

    /// Interpolate from `base` towards the far color by IR0, then push the result onto the color
    /// FIFO.
    fn interpolate(&mut self, base: Vec3, sf: u32, lm: bool) {
        let fc = self.control_vec(FC);
        let ir0 = self.ir0();

        let mut vals = [0; 3];
        for i in 0..3 {
            let diff = fc[i] - base[i];
            check_mac_overflow(&mut self.flags, i, diff);

            let ir = i64::from(lim_a(&mut self.flags, i, (diff >> sf) as i32, false));

            let scaled = ir * ir0;
            check_mac_overflow(&mut self.flags, i, scaled);

            vals[i] = scaled + base[i];
        }

        self.set_mac_ir(vals, sf, lm);
        self.push_color();
    }

    /// Multiply vector `n` by the light matrix and store the result in IR1..3.
    fn light(&mut self, n: usize, sf: u32, lm: bool) {
        let (llm, vec) = (self.matrix(LLM), self.vector(n));
        let vals = mat_mul_add(&mut self.flags, &llm, &vec, &[0; 3]);

        for (i, val) in vals.into_iter().enumerate() {
            self.set_ir(i, (val >> sf) as i32, lm);
        }
    }

    /// Add the background color to IR1..3 multiplied by the light color matrix, storing the result
    /// in IR1..3. Returns the unshifted sums.
    fn background(&mut self, sf: u32, lm: bool) -> Vec3 {
        let (lcm, ir, bk) = (self.matrix(LCM), self.ir_vec(), self.control_vec(BK));
        let vals = mat_mul_add(&mut self.flags, &lcm, &ir, &bk);

        for (i, val) in vals.into_iter().enumerate() {
            self.set_ir(i, (val >> sf) as i32, lm);
        }

        vals
    }

    /// IR1..3 multiplied by the RGBC color.
    fn color_mul(&mut self) -> Vec3 {
        let (ir, rgbc) = (self.ir_vec(), self.rgbc(4));
        let mut vals = [0; 3];
        for i in 0..3 {
            vals[i] = ir[i] * rgbc[i];
            check_mac_overflow(&mut self.flags, i, vals[i]);
        }
        vals
    }

    fn ncd(&mut self, n: usize, sf: u32, lm: bool) {
        self.light(n, sf, lm);
        self.background(sf, lm);
        let color = self.color_mul();
        self.interpolate(color, sf, lm);
    }

    fn ncc(&mut self, n: usize, sf: u32, lm: bool) {
        self.light(n, sf, lm);
        self.cc(sf, lm);
    }

    fn cc(&mut self, sf: u32, lm: bool) {
        self.background(sf, lm);
        let color = self.color_mul();
        self.set_mac_ir(color, sf, lm);
        self.push_color();
    }

    fn nc(&mut self, n: usize, sf: u32, lm: bool) {
        self.light(n, sf, lm);
        let vals = self.background(sf, lm);
        self.set_mac_ir(vals, sf, lm);
        self.push_color();
    }

    fn avsz(&mut self, scale: usize, first: usize) {
        let sum: i64 = (first..4).map(|i| i64::from(self.regs[SZ0 + i])).sum();
        let avg = low(self.regs[scale]) * sum;

        check_mac0_overflow(&mut self.flags, avg);

        let otz = lim_c(&mut self.flags, (avg >> 12) as i32);
        self.regs[OTZ] = u32::from(otz);
        self.regs[MAC0] = avg as i32 as u32;
    }
}

/// Commands.
impl Gte {
    /// Perspective transform a single vertex.
    fn cmd_rtps(&mut self, op: GteOp) {
        self.rtp(0, op.sf(), op.lm(), true);
    }

    /// Perspective transform three vertices.
    fn cmd_rtpt(&mut self, op: GteOp) {
        for n in 0..3 {
            self.rtp(n, op.sf(), op.lm(), n == 2);
        }
    }

    /// Normal clipping. Twice the signed area of the triangle in the screen XY FIFO.
    fn cmd_nclip(&mut self, _: GteOp) {
        let [x0, x1, x2] = [SXY0, SXY1, SXY2].map(|r| low(self.regs[r]));
        let [y0, y1, y2] = [SXY0, SXY1, SXY2].map(|r| high(self.regs[r]));

        let area = x0 * y1 + x1 * y2 + x2 * y0 - x0 * y2 - x1 * y0 - x2 * y1;

        check_mac0_overflow(&mut self.flags, area);
        self.regs[MAC0] = area as i32 as u32;
    }

    /// Outer product of IR1..3 and the diagonal of the rotation matrix.
    fn cmd_op(&mut self, op: GteOp) {
        let d = [low(self.regs[RT]), low(self.regs[RT + 2]), low(self.regs[RT + 4])];
        let ir = self.ir_vec();

        let vals = [
            ir[2] * d[1] - ir[1] * d[2],
            ir[0] * d[2] - ir[2] * d[0],
            ir[1] * d[0] - ir[0] * d[1],
        ];

        self.set_mac_ir(vals, op.sf(), op.lm());
    }

    /// Depth cue the RGBC color.
    fn cmd_dpcs(&mut self, op: GteOp) {
        let base = self.rgbc(16);
        self.interpolate(base, op.sf(), op.lm());
    }

    /// Depth cue the first color in the color FIFO three times.
    fn cmd_dpct(&mut self, op: GteOp) {
        for _ in 0..3 {
            let rgb = self.regs[RGB0];
            let base = [0, 1, 2].map(|i| i64::from(rgb.bit_range(i * 8, i * 8 + 7)) << 16);
            self.interpolate(base, op.sf(), op.lm());
        }
    }

    /// Interpolate between IR1..3 and the far color.
    fn cmd_intpl(&mut self, op: GteOp) {
        let base = self.ir_vec().map(|ir| ir << 12);
        self.interpolate(base, op.sf(), op.lm());
    }

    /// Depth cue IR1..3 multiplied by the RGBC color.
    fn cmd_dcpl(&mut self, op: GteOp) {
        let base = self.color_mul();
        self.interpolate(base, op.sf(), op.lm());
    }

    /// General matrix and vector multiply with translation.
    fn cmd_mvmva(&mut self, op: GteOp) {
        let (sf, lm) = (op.sf(), op.lm());

        let mat = match op.mx() {
            0 => self.matrix(RT),
            1 => self.matrix(LLM),
            2 => self.matrix(LCM),
            _ => {
                // The garbage matrix selected by mx = 3.
                let r = i64::from(self.regs[RGBC] & 0xff) << 4;
                let rt13 = low(self.regs[RT + 1]);
                let rt22 = low(self.regs[RT + 2]);
                [[-r, r, self.ir0()], [rt13; 3], [rt22; 3]]
            }
        };

        let vec = match op.vx() {
            3 => self.ir_vec(),
            n => self.vector(n as usize),
        };

        let tr = match op.tx() {
            0 => self.control_vec(TR),
            1 => self.control_vec(BK),
            2 => self.control_vec(FC),
            _ => [0; 3],
        };

        if op.tx() != 2 {
            let vals = mat_mul_add(&mut self.flags, &mat, &vec, &tr);
            self.set_mac_ir(vals, sf, lm);
            return;
        }

        // With the far color as translation, the first column is only used to raise flags and
        // the result is made from the other two.
        let mut vals = [0; 3];
        for row in 0..3 {
            let partial = tr[row] + mat[row][0] * vec[0];
            check_mac_overflow(&mut self.flags, row, partial);
            lim_a(&mut self.flags, row, (partial >> sf) as i32, false);

            vals[row] = mat[row][1] * vec[1] + mat[row][2] * vec[2];
        }

        self.set_mac_ir(vals, sf, lm);
    }

    /// Normal color depth cue of a single vertex.
    fn cmd_ncds(&mut self, op: GteOp) {
        self.ncd(0, op.sf(), op.lm());
    }

    fn cmd_ncdt(&mut self, op: GteOp) {
        for n in 0..3 {
            self.ncd(n, op.sf(), op.lm());
        }
    }

    /// Color depth cue from IR1..3.
    fn cmd_cdp(&mut self, op: GteOp) {
        let (sf, lm) = (op.sf(), op.lm());
        self.background(sf, lm);
        let color = self.color_mul();
        self.interpolate(color, sf, lm);
    }

    fn cmd_nccs(&mut self, op: GteOp) {
        self.ncc(0, op.sf(), op.lm());
    }

    fn cmd_ncct(&mut self, op: GteOp) {
        for n in 0..3 {
            self.ncc(n, op.sf(), op.lm());
        }
    }

    fn cmd_cc(&mut self, op: GteOp) {
        self.cc(op.sf(), op.lm());
    }

    fn cmd_ncs(&mut self, op: GteOp) {
        self.nc(0, op.sf(), op.lm());
    }

    fn cmd_nct(&mut self, op: GteOp) {
        for n in 0..3 {
            self.nc(n, op.sf(), op.lm());
        }
    }

    /// Square IR1..3.
    fn cmd_sqr(&mut self, op: GteOp) {
        let vals = self.ir_vec().map(|ir| ir * ir);
        self.set_mac_ir(vals, op.sf(), op.lm());
    }

    /// Average of the last three depth values.
    fn cmd_avsz3(&mut self, _: GteOp) {
        self.avsz(ZSF3, 1);
    }

    /// Average of all four depth values.
    fn cmd_avsz4(&mut self, _: GteOp) {
        self.avsz(ZSF4, 0);
    }

    /// General purpose interpolation. IR1..3 scaled by IR0.
    fn cmd_gpf(&mut self, op: GteOp) {
        let ir0 = self.ir0();
        let vals = self.ir_vec().map(|ir| ir * ir0);

        self.set_mac_ir(vals, op.sf(), op.lm());
        self.push_color();
    }

    /// Like GPF, but accumulates onto MAC1..3.
    fn cmd_gpl(&mut self, op: GteOp) {
        let (sf, ir0, ir) = (op.sf(), self.ir0(), self.ir_vec());

        let mut vals = [0; 3];
        for i in 0..3 {
            let mac = i64::from(self.regs[MAC1 + i] as i32) << sf;
            vals[i] = mac + ir[i] * ir0;
        }

        self.set_mac_ir(vals, sf, op.lm());
        self.push_color();
    }
}
