//! Typed simulation analyses.

use serde::{Deserialize, Serialize};

use crate::simulator_capnp::{commands, result, AcType};

/// Frequency sweep spacing for AC and noise analyses.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AcSweep {
    /// Points per decade.
    Dec,
    /// Points per octave.
    Oct,
    /// Linearly spaced points.
    Lin,
}

impl From<AcSweep> for AcType {
    fn from(sweep: AcSweep) -> Self {
        match sweep {
            AcSweep::Dec => AcType::Dec,
            AcSweep::Oct => AcType::Oct,
            AcSweep::Lin => AcType::Lin,
        }
    }
}

/// One simulation command, with the vectors to save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Analysis {
    /// DC operating point.
    Op {
        /// Vectors to save.
        vectors: Vec<String>,
    },
    /// Non-linear time-domain simulation.
    Tran {
        /// Suggested computing increment (sec).
        step: f64,
        /// Stop time (sec).
        stop: f64,
        /// Start time (sec).
        start: f64,
        /// Vectors to save.
        vectors: Vec<String>,
    },
    /// Small-signal AC sweep about the DC operating point.
    Ac {
        /// Sweep spacing.
        sweep: AcSweep,
        /// Number of points (per decade/octave, or total).
        points: u32,
        /// Start frequency (Hz).
        fstart: f64,
        /// Stop frequency (Hz).
        fstop: f64,
        /// Vectors to save.
        vectors: Vec<String>,
    },
    /// DC sweep of an independent source.
    Dc {
        /// The source to sweep.
        source: String,
        /// Start value.
        start: f64,
        /// Stop value.
        stop: f64,
        /// Increment.
        step: f64,
        /// Vectors to save.
        vectors: Vec<String>,
    },
    /// Noise analysis between an output node and an input source.
    Noise {
        /// The output node, e.g. `v(out)`.
        output: String,
        /// The input source, e.g. `vin`.
        input: String,
        /// Sweep spacing.
        sweep: AcSweep,
        /// Number of points.
        points: u32,
        /// Start frequency (Hz).
        fstart: f64,
        /// Stop frequency (Hz).
        fstop: f64,
        /// Vectors to save.
        vectors: Vec<String>,
    },
}

fn set_vectors(
    mut list: capnp::text_list::Builder<'_>,
    vectors: &[String],
) {
    for (i, vector) in vectors.iter().enumerate() {
        list.set(i as u32, vector.as_str());
    }
}

impl Analysis {
    /// Sends this analysis on a commands capability, returning the
    /// (pipelined) streaming result handle.
    pub(crate) fn send(&self, commands: &commands::Client) -> result::Client {
        match self {
            Analysis::Op { vectors } => {
                let mut request = commands.op_request();
                set_vectors(request.get().init_vectors(vectors.len() as u32), vectors);
                request.send().pipeline.get_result()
            }
            Analysis::Tran {
                step,
                stop,
                start,
                vectors,
            } => {
                let mut request = commands.tran_request();
                {
                    let mut params = request.get();
                    params.set_step(*step);
                    params.set_stop(*stop);
                    params.set_start(*start);
                    set_vectors(params.init_vectors(vectors.len() as u32), vectors);
                }
                request.send().pipeline.get_result()
            }
            Analysis::Ac {
                sweep,
                points,
                fstart,
                fstop,
                vectors,
            } => {
                let mut request = commands.ac_request();
                {
                    let mut params = request.get();
                    params.set_mode((*sweep).into());
                    params.set_points(*points);
                    params.set_start(*fstart);
                    params.set_stop(*fstop);
                    set_vectors(params.init_vectors(vectors.len() as u32), vectors);
                }
                request.send().pipeline.get_result()
            }
            Analysis::Dc {
                source,
                start,
                stop,
                step,
                vectors,
            } => {
                let mut request = commands.dc_request();
                {
                    let mut params = request.get();
                    params.set_source(source.as_str());
                    params.set_start(*start);
                    params.set_stop(*stop);
                    params.set_step(*step);
                    set_vectors(params.init_vectors(vectors.len() as u32), vectors);
                }
                request.send().pipeline.get_result()
            }
            Analysis::Noise {
                output,
                input,
                sweep,
                points,
                fstart,
                fstop,
                vectors,
            } => {
                let mut request = commands.noise_request();
                {
                    let mut params = request.get();
                    params.set_output(output.as_str());
                    params.set_input(input.as_str());
                    params.set_mode((*sweep).into());
                    params.set_points(*points);
                    params.set_start(*fstart);
                    params.set_stop(*fstop);
                    set_vectors(params.init_vectors(vectors.len() as u32), vectors);
                }
                request.send().pipeline.get_result()
            }
        }
    }
}
