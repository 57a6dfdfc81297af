//! Output-side writer plans.
//!
//! Writers are the materializing counterpart of calcs: where a `Calc` reads
//! a scalar out of the live operator graph, a `Writer` copies one into a
//! column of a record being built. Spooling operators compose one `Copy`
//! writer per output column.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;

use trellis_core::Result;
use trellis_store::RecordWriter;

use crate::calc::{Calc, CalcPlanRef};
use crate::plan::OperatorMap;

/// Shared handle to a writer plan node.
pub type WriterPlanRef = Rc<WriterPlan>;

/// Logical description of how to fill (part of) an output record.
pub enum WriterPlan {
    /// Evaluate a calculation and store it into one destination column.
    Copy { src: CalcPlanRef, dst_index: usize },
    /// Apply several writers to the same record.
    Composite(Vec<WriterPlanRef>),
}

impl WriterPlan {
    /// Binds this plan against the operators in `om`.
    pub fn to_writer(&self, om: &OperatorMap) -> Result<Writer> {
        match self {
            WriterPlan::Copy { src, dst_index } => Ok(Writer::Copy {
                src: Box::new(src.to_calc(om)?),
                dst_index: *dst_index,
            }),
            WriterPlan::Composite(parts) => {
                let mut writers = Vec::with_capacity(parts.len());
                for part in parts {
                    writers.push(part.to_writer(om)?);
                }
                Ok(Writer::Composite(writers))
            }
        }
    }
}

/// Live writer bound to the operators of one execution.
pub enum Writer {
    Copy { src: Box<Calc>, dst_index: usize },
    Composite(Vec<Writer>),
}

impl Writer {
    /// Evaluates the bound calculations against the current rows and
    /// stores the results into `rec`.
    pub fn write(&self, rec: &mut RecordWriter) -> Result<()> {
        match self {
            Writer::Copy { src, dst_index } => rec.set(*dst_index, src.eval()?),
            Writer::Composite(parts) => {
                for part in parts {
                    part.write(rec)?;
                }
                Ok(())
            }
        }
    }
}
