//! Code-split routes and server component payload caching, end to end.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use pulse_integration_tests::CountingTransport;
use pulse_pages::{Container, View};
use pulse_router::{
	Outlet, OutletOptions, PscClient, PscOptions, RouteConfig, Router, lazy,
};
use tokio::task::LocalSet;

#[tokio::test]
async fn lazy_route_loads_exactly_once_across_navigations() {
	let local = LocalSet::new();
	local
		.run_until(async {
			let loads = Rc::new(Cell::new(0u32));
			let loads_loader = Rc::clone(&loads);
			let handler = lazy(move || {
				loads_loader.set(loads_loader.get() + 1);
				async { Ok(View::text("Reports")) }
			});

			let router = Router::builder()
				.route(RouteConfig::view("/", |_| View::text("Home")))
				.route(RouteConfig::lazy("/reports", handler))
				.build();
			let outlet = Outlet::attach(&router, Container::new(), OutletOptions::default());

			assert!(router.push("/reports").await.unwrap());
			tokio::task::yield_now().await;
			assert_eq!(outlet.container().render_to_string(), "Reports");

			assert!(router.push("/").await.unwrap());
			assert!(router.push("/reports").await.unwrap());
			tokio::task::yield_now().await;
			assert_eq!(outlet.container().render_to_string(), "Reports");
			assert_eq!(loads.get(), 1);
		})
		.await;
}

#[tokio::test(start_paused = true)]
async fn navigating_away_mid_load_still_yields_one_load() {
	let local = LocalSet::new();
	local
		.run_until(async {
			let loads = Rc::new(Cell::new(0u32));
			let loads_loader = Rc::clone(&loads);
			let handler = lazy(move || {
				loads_loader.set(loads_loader.get() + 1);
				async {
					tokio::time::sleep(Duration::from_millis(300)).await;
					Ok(View::text("Heavy"))
				}
			});

			let router = Router::builder()
				.route(RouteConfig::view("/", |_| View::text("Home")))
				.route(RouteConfig::lazy("/heavy", handler))
				.build();
			let outlet = Outlet::attach(&router, Container::new(), OutletOptions::default());

			assert!(router.push("/heavy").await.unwrap());
			// Leave before the load settles, then come back.
			assert!(router.push("/").await.unwrap());
			assert!(router.push("/heavy").await.unwrap());

			tokio::time::sleep(Duration::from_millis(500)).await;
			assert_eq!(outlet.container().render_to_string(), "Heavy");
			assert_eq!(loads.get(), 1, "the in-flight load must be reused");
		})
		.await;
}

#[tokio::test]
async fn router_preload_warms_the_component_cache() {
	let loads = Rc::new(Cell::new(0u32));
	let loads_loader = Rc::clone(&loads);
	let handler = lazy(move || {
		loads_loader.set(loads_loader.get() + 1);
		async { Ok(View::text("Settings")) }
	});
	let handle = handler.clone();

	let router = Router::builder()
		.route(RouteConfig::lazy("/settings", handler))
		.build();

	// Hover prefetch: load without mounting.
	router.preload("/settings").await;
	assert_eq!(loads.get(), 1);
	assert!(handle.cached().is_some());

	router.preload("/settings").await;
	assert_eq!(loads.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn psc_staleness_window_controls_refetching() {
	let transport = CountingTransport::shared();
	let client = PscClient::new(transport.clone());
	let options = PscOptions {
		stale_time: Some(Duration::from_millis(10_000)),
		..Default::default()
	};

	let _ = client.navigate("/feed", &options).await.unwrap();
	let _ = client.navigate("/feed", &options).await.unwrap();
	assert_eq!(transport.calls.get(), 1, "fresh entry must be served from cache");

	tokio::time::advance(Duration::from_millis(10_500)).await;
	let _ = client.navigate("/feed", &options).await.unwrap();
	assert_eq!(transport.calls.get(), 2, "stale entry must refetch");
}

#[tokio::test]
async fn prefetch_then_navigate_uses_the_warm_cache() {
	let transport = CountingTransport::shared();
	let client = PscClient::new(transport.clone());
	let options = PscOptions::default();

	tokio::join!(
		client.prefetch("/articles?page=1", &options),
		client.prefetch("/articles?page=1", &options),
	);
	assert_eq!(transport.calls.get(), 1);

	let payload = client.navigate("/articles?page=1", &options).await.unwrap();
	assert_eq!(transport.calls.get(), 1, "navigation must reuse the prefetched payload");
	assert_eq!(payload["url"], "/articles?page=1");
}
