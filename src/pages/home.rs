use leptos::prelude::*;

use crate::components::fiber_background::{FiberBackground, FiberControls, QualityTier};

/// Demo page: the background behind a hero block with live quality controls.
#[component]
pub fn Home() -> impl IntoView {
	let controls = FiberControls::new();
	let density = RwSignal::new(None::<usize>);

	let quality_button = move |tier: QualityTier| {
		let class = move || {
			if controls.tier.get() == tier {
				"quality-option active"
			} else {
				"quality-option"
			}
		};
		view! {
			<button class=class on:click=move |_| controls.select(tier)>
				{tier.as_str()}
			</button>
		}
	};

	view! {
		<FiberBackground controls=controls path_count=Signal::derive(move || density.get()) />
		<main class="hero" style="position: relative; z-index: 1;">
			<h1>"Fiber Background"</h1>
			<p class="subtitle">"Light pulses travelling along generated fiber paths."</p>
			<div class="quality-controls">
				{QualityTier::ALL.into_iter().map(quality_button).collect_view()}
				<button on:click=move |_| controls.toggle_pause()>
					{move || if controls.paused.get() { "resume" } else { "pause" }}
				</button>
			</div>
			<div class="density-controls">
				{[None, Some(6), Some(12)]
					.into_iter()
					.map(|count| {
						let label = count.map_or("auto".to_string(), |n| format!("{n} fibers"));
						view! { <button on:click=move |_| density.set(count)>{label}</button> }
					})
					.collect_view()}
			</div>
			<p class="fps">
				{move || format!("{:.0} fps", controls.fps.get())}
				{move || controls.failed.get().then_some(" (static)")}
			</p>
		</main>
	}
}
