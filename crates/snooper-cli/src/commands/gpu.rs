use snooper_core::{AcceleratorProbe, Sampled, sources};

use super::{OutputFormat, PollPlan, emit, exit_on_error, poll};
use crate::format;

pub fn run(plan: PollPlan, output: OutputFormat) {
    let source = sources::native().accelerator;
    let probe = AcceleratorProbe::new();
    // Accelerator sampling is stateless and never fails; no warmup applies.
    exit_on_error(poll(
        plan,
        || Ok(Sampled::Ready(probe.sample_source(source.as_ref()))),
        |sample| emit(output, &sample, |s| vec![format::gpu_line(s)]),
    ));
}
