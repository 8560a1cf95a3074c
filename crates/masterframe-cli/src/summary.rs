use std::path::Path;

use console::Style;
use masterframe_core::master::MasterFrame;
use masterframe_core::pipeline::config::StageConfig;
use masterframe_core::reject::RejectionPolicy;
use masterframe_core::scale::ScalingPolicy;
use masterframe_core::stats::FrameStats;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_stage_summary(config: &StageConfig) {
    let s = Styles::new();
    let c = &config.combine;

    println!();
    println!(
        "  {}",
        s.title.apply_to(format!("Master {}", config.stage))
    );
    println!("  {}", s.title.apply_to("\u{2550}".repeat(16)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Inputs"),
        s.value.apply_to(format!("{} frames", config.inputs.len()))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output.display())
    );
    if let Some(sec) = c.statsec {
        println!("  {:<14}{}", s.label.apply_to("Section"), s.value.apply_to(sec));
    }
    println!();

    println!("  {}", s.header.apply_to("Combination"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Method"),
        s.method.apply_to(c.combine_method)
    );
    print_rejection(&s, &c.rejection_policy());
    if c.scale == ScalingPolicy::None {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Scale"),
            s.disabled.apply_to("none")
        );
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Scale"),
            s.method.apply_to(c.scale)
        );
    }
    println!();
}

fn print_rejection(s: &Styles, policy: &RejectionPolicy) {
    if *policy == RejectionPolicy::None {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Reject"),
            s.disabled.apply_to("none")
        );
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Reject"),
            s.method.apply_to(policy)
        );
    }
}

pub fn print_master_summary(master: &MasterFrame, output: &Path, preview: Option<&Path>) {
    let s = Styles::new();
    let stats = FrameStats::of(master.data());

    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Combined"),
        s.value.apply_to(format!(
            "{} frames, {}x{}",
            master.provenance().source_count,
            master.width(),
            master.height()
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Median"),
        s.value.apply_to(format!("{:.4}", stats.median))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Std dev"),
        s.value.apply_to(format!("{:.4}", stats.stddev))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Saved"),
        s.path.apply_to(output.display())
    );
    if let Some(preview) = preview {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Preview"),
            s.path.apply_to(preview.display())
        );
    }
}
