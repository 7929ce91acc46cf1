use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use vdma::regs::{
    field_get, CR_DELAY_MASK, CR_DELAY_SHIFT, CR_FRMCNT_EN_MASK, CR_FRMCNT_MASK, CR_FRMCNT_SHIFT,
    CR_FSYNC_SRC_MASK, CR_FSYNC_SRC_OTHER, CR_FSYNC_SRC_TUSER, CR_GENLCK_RPT_MASK,
    CR_GENLCK_SRC_MASK, CR_RD_PTR_MASK, CR_RD_PTR_SHIFT, CR_RESET_MASK, CR_RUNSTOP_MASK,
    CR_SYNC_EN_MASK, CR_TAIL_EN_MASK, IXR_DELAYCNT_MASK, IXR_ERROR_MASK, IXR_FRMCNT_MASK,
    PARKPTR_READREF_MASK, PARKPTR_READSTR_MASK, PARKPTR_READSTR_SHIFT, PARKPTR_WRTREF_MASK,
    PARKPTR_WRTREF_SHIFT, PARKPTR_WRTSTR_MASK, PARKPTR_WRTSTR_SHIFT, SR_ERR_DECODE_MASK,
    SR_ERR_FSZ_LESS_MASK, SR_ERR_FSZ_MORE_MASK, SR_ERR_INTERNAL_MASK, SR_ERR_LSZ_LESS_MASK,
    SR_ERR_SG_DEC_MASK, SR_ERR_SG_SLV_MASK, SR_ERR_SLAVE_MASK, SR_HALTED_MASK, SR_IDLE_MASK,
};
use vdma::VdmaVersion;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Register {
    /// Channel control register
    Cr,
    /// Channel status register
    Sr,
    /// Shared park pointer register
    Parkptr,
    /// Version register
    Version,
}

const CR_FLAGS: &[(u32, &str)] = &[
    (CR_RUNSTOP_MASK, "RUNSTOP"),
    (CR_TAIL_EN_MASK, "CIRCULAR"),
    (CR_RESET_MASK, "RESET"),
    (CR_SYNC_EN_MASK, "SYNC_EN"),
    (CR_FRMCNT_EN_MASK, "FRMCNT_EN"),
    (CR_GENLCK_SRC_MASK, "GENLOCK_INTERNAL"),
    (CR_GENLCK_RPT_MASK, "GENLOCK_REPEAT"),
];

const SR_FLAGS: &[(u32, &str)] = &[
    (SR_HALTED_MASK, "HALTED"),
    (SR_IDLE_MASK, "IDLE"),
    (SR_ERR_INTERNAL_MASK, "ERR_INTERNAL"),
    (SR_ERR_SLAVE_MASK, "ERR_SLAVE"),
    (SR_ERR_DECODE_MASK, "ERR_DECODE"),
    (SR_ERR_FSZ_LESS_MASK, "ERR_FRAME_SIZE_LESS"),
    (SR_ERR_LSZ_LESS_MASK, "ERR_LINE_SIZE_LESS"),
    (SR_ERR_SG_SLV_MASK, "ERR_SG_SLAVE"),
    (SR_ERR_SG_DEC_MASK, "ERR_SG_DECODE"),
    (SR_ERR_FSZ_MORE_MASK, "ERR_FRAME_SIZE_MORE"),
    (IXR_FRMCNT_MASK, "IRQ_FRAME_COUNT"),
    (IXR_DELAYCNT_MASK, "IRQ_DELAY"),
    (IXR_ERROR_MASK, "IRQ_ERROR"),
];

pub fn run(register: Register, value: &str) -> Result<()> {
    let raw = parse_value(value)?;

    println!();
    println!("{}", format!("🔎 {register:?} = {raw:#010x}").cyan().bold());
    for (name, field) in decode(register, raw) {
        println!("  {:<20} {}", name.dimmed(), field);
    }
    println!();
    Ok(())
}

pub fn parse_value(value: &str) -> Result<u32> {
    let trimmed = value.trim().replace('_', "");
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse::<u32>(),
    };
    parsed.with_context(|| format!("'{value}' is not a 32-bit register value"))
}

/// Field name and rendered value for every field of `register`.
pub fn decode(register: Register, raw: u32) -> Vec<(&'static str, String)> {
    match register {
        Register::Cr => {
            let mut fields = flags(CR_FLAGS, raw);
            let fsync = match raw & CR_FSYNC_SRC_MASK {
                0 => "fsync",
                CR_FSYNC_SRC_OTHER => "other channel",
                CR_FSYNC_SRC_TUSER => "s2mm tuser",
                _ => "reserved",
            };
            fields.push(("FSYNC_SRC", fsync.to_string()));
            fields.push((
                "RD_PTR",
                field_get(raw, CR_RD_PTR_MASK, CR_RD_PTR_SHIFT).to_string(),
            ));
            fields.push((
                "IRQ_FRAME_COUNT",
                field_get(raw, CR_FRMCNT_MASK, CR_FRMCNT_SHIFT).to_string(),
            ));
            fields.push((
                "IRQ_DELAY_COUNT",
                field_get(raw, CR_DELAY_MASK, CR_DELAY_SHIFT).to_string(),
            ));
            fields
        }
        Register::Sr => flags(SR_FLAGS, raw),
        Register::Parkptr => vec![
            ("READ_PARK", (raw & PARKPTR_READREF_MASK).to_string()),
            (
                "WRITE_PARK",
                field_get(raw, PARKPTR_WRTREF_MASK, PARKPTR_WRTREF_SHIFT).to_string(),
            ),
            (
                "READ_CURRENT",
                field_get(raw, PARKPTR_READSTR_MASK, PARKPTR_READSTR_SHIFT).to_string(),
            ),
            (
                "WRITE_CURRENT",
                field_get(raw, PARKPTR_WRTSTR_MASK, PARKPTR_WRTSTR_SHIFT).to_string(),
            ),
        ],
        Register::Version => {
            let version = VdmaVersion::from_raw(raw);
            vec![
                ("VERSION", version.to_string()),
                ("SG_IMPLIED", (version.major < 3).to_string()),
            ]
        }
    }
}

fn flags(table: &[(u32, &'static str)], raw: u32) -> Vec<(&'static str, String)> {
    table
        .iter()
        .map(|&(mask, name)| (name, (raw & mask != 0).to_string()))
        .collect()
}
