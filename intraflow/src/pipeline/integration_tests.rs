//! End-to-end tests for the intraday pipeline.

#[cfg(test)]
mod tests {
    use crate::config::PipelineConfig;
    use crate::context::SlotValue;
    use crate::core::{RequestItem, SlotKey, StageOutputRecord};
    use crate::dispatch::DispatchMode;
    use crate::errors::{ErrorKind, IntraflowError};
    use crate::events::{self, CollectingEventSink};
    use crate::handlers::kinds;
    use crate::pipeline::{IntradayPipeline, PipelineBuilder, PipelineRequest};
    use crate::stages::{FnStage, SlotInput, StrategyOutcome};
    use crate::testing::{
        aapl_surge_request, assert_entry_failure, assert_entry_success, assert_record_keys,
        assert_slots_written, economic_request, news_request, prices_request,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn quiet_pipeline(config: &PipelineConfig) -> IntradayPipeline {
        IntradayPipeline::standard_builder(config)
            .unwrap()
            .with_event_sink(Arc::new(events::NoOpEventSink))
            .build()
            .unwrap()
    }

    fn standard() -> IntradayPipeline {
        quiet_pipeline(&PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_aapl_surge_session() {
        let ctx = standard().run(aapl_surge_request()).await.unwrap();

        assert_slots_written(&ctx, &SlotKey::ALL);

        let fetch = ctx.real_time_data().unwrap();
        let prices = assert_entry_success(fetch, "intraday_prices_AAPL_5min");
        assert_eq!(prices["bars"].as_array().unwrap().len(), 12);

        let patterns = ctx.pattern_recognition().unwrap();
        let surge = assert_entry_success(patterns, kinds::PRICE_VOLUME_SURGE);
        assert_eq!(surge["detected"], json!(true));
        assert_eq!(surge["timestamp"], json!("2023-10-27 10:10:00"));

        let summary = ctx.analysis_summary().unwrap();
        assert_eq!(summary.ticker_analyzed, "AAPL");
        assert_eq!(summary.detected_kinds(), vec![kinds::PRICE_VOLUME_SURGE]);
        assert!(summary.data_gaps.is_empty());
        assert!(summary.overall_intraday_outlook.is_some());

        let proposals = ctx.strategy_proposals().unwrap().proposals();
        assert_eq!(proposals.len(), 1);
        let proposal = &proposals[0];
        assert_eq!(proposal.based_on_patterns, vec![kinds::PRICE_VOLUME_SURGE.to_string()]);
        assert_eq!(proposal.exit_conditions.profit_target_pct, 2.0);
        assert_eq!(proposal.exit_conditions.stop_loss_pct, 1.0);
        assert!(proposal.entry_conditions.contains("10:10:00"));
        assert!(proposal.alignment.contains("scalp profits"));
    }

    #[tokio::test]
    async fn test_unsupported_pattern_is_isolated() {
        let request = aapl_surge_request().with_pattern("unsupported_pattern");
        let ctx = standard().run(request).await.unwrap();

        let patterns = ctx.pattern_recognition().unwrap();
        assert_eq!(patterns.len(), 2);
        assert_entry_success(patterns, kinds::PRICE_VOLUME_SURGE);
        assert_entry_failure(patterns, "unsupported_pattern", ErrorKind::UnknownKind);

        let summary = ctx.analysis_summary().unwrap();
        assert_eq!(summary.identified_patterns_summary.unavailable.len(), 1);
        assert!(summary
            .data_gaps
            .iter()
            .any(|g| g.reason == ErrorKind::UnknownKind && g.slot == SlotKey::PatternRecognition));
        assert!(!ctx.strategy_proposals().unwrap().is_rejected());
    }

    #[tokio::test]
    async fn test_no_patterns_yields_rejection() {
        let request = PipelineRequest::new("AAPL")
            .with_data_request(prices_request("AAPL", "5min", 12))
            .with_risk_tolerance("high");
        let ctx = standard().run(request).await.unwrap();

        assert!(ctx.pattern_recognition().unwrap().is_empty());
        let outcome = ctx.strategy_proposals().unwrap();
        assert!(outcome.proposals().is_empty());
        let StrategyOutcome::Rejected(rejection) = outcome else {
            panic!("expected a rejection, got {outcome:?}");
        };
        assert_eq!(rejection.error, ErrorKind::InsufficientAnalysis);
        assert!(rejection.details.contains("AAPL"));
    }

    #[tokio::test]
    async fn test_surge_without_prices_is_insufficient_data() {
        let request = PipelineRequest::new("AAPL").with_pattern(kinds::PRICE_VOLUME_SURGE);
        let ctx = standard().run(request).await.unwrap();

        assert!(ctx.real_time_data().unwrap().is_empty());
        assert_entry_failure(
            ctx.pattern_recognition().unwrap(),
            kinds::PRICE_VOLUME_SURGE,
            ErrorKind::InsufficientData,
        );
        assert!(ctx.strategy_proposals().unwrap().is_rejected());
    }

    #[tokio::test]
    async fn test_only_unsupported_pattern_reports_gap_and_rejects() {
        let request = PipelineRequest::new("AAPL")
            .with_data_request(prices_request("AAPL", "5min", 12))
            .with_pattern("unsupported_pattern");
        let ctx = standard().run(request).await.unwrap();

        let patterns = ctx.pattern_recognition().unwrap();
        assert_record_keys(patterns, &["unsupported_pattern"]);
        assert_entry_failure(patterns, "unsupported_pattern", ErrorKind::UnknownKind);

        let summary = ctx.analysis_summary().unwrap();
        let gap = summary
            .data_gaps
            .iter()
            .find(|g| g.key.as_deref() == Some("unsupported_pattern"))
            .unwrap();
        assert_eq!(gap.slot, SlotKey::PatternRecognition);
        assert_eq!(gap.reason, ErrorKind::UnknownKind);

        let StrategyOutcome::Rejected(rejection) = ctx.strategy_proposals().unwrap() else {
            panic!("expected a rejection");
        };
        assert_eq!(rejection.error, ErrorKind::InsufficientAnalysis);
        assert!(rejection
            .details
            .starts_with("The intraday analysis summary lacked clear patterns or actionable insights for AAPL."));
        assert!(rejection.details.contains("unsupported_pattern (UnknownKind)"));
    }

    #[tokio::test]
    async fn test_other_ticker_prices_are_not_attributed() {
        let request = PipelineRequest::new("AAPL")
            .with_data_request(prices_request("MSFT", "5min", 12))
            .with_pattern(kinds::PRICE_VOLUME_SURGE);
        let ctx = standard().run(request).await.unwrap();

        assert_entry_success(ctx.real_time_data().unwrap(), "intraday_prices_MSFT_5min");
        assert_entry_failure(
            ctx.pattern_recognition().unwrap(),
            kinds::PRICE_VOLUME_SURGE,
            ErrorKind::InsufficientData,
        );

        let summary = ctx.analysis_summary().unwrap();
        assert_eq!(summary.current_market_snapshot.last_price, None);
        assert!(!summary.current_market_snapshot.price_action.contains("last traded"));
        assert!(summary
            .data_gaps
            .iter()
            .any(|g| g.slot == SlotKey::RealTimeData && g.message.contains("AAPL")));
        assert!(ctx.strategy_proposals().unwrap().is_rejected());
    }

    #[tokio::test]
    async fn test_opening_window_volatility_alone_is_not_a_strategy() {
        let request = PipelineRequest::new("AAPL")
            .with_data_request(prices_request("AAPL", "5min", 12))
            .with_pattern(kinds::TIME_OF_DAY_VOLATILITY);
        let ctx = standard().run(request).await.unwrap();

        let volatility = assert_entry_success(ctx.pattern_recognition().unwrap(), kinds::TIME_OF_DAY_VOLATILITY);
        assert_eq!(volatility["rest_of_session_volatility_pct"], json!(null));

        let outcome = ctx.strategy_proposals().unwrap();
        assert!(outcome.is_rejected());
        assert!(outcome.proposals().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_price_requests_keep_every_result() {
        let request = PipelineRequest::new("AAPL")
            .with_data_request(prices_request("AAPL", "5min", 12))
            .with_data_request(prices_request("AAPL", "5min", 24));
        let ctx = standard().run(request).await.unwrap();

        let fetch = ctx.real_time_data().unwrap();
        assert_record_keys(fetch, &["intraday_prices_AAPL_5min", "intraday_prices_AAPL_5min"]);

        let json = ctx.to_json();
        let rendered = json[SlotKey::RealTimeData.as_str()].as_object().unwrap();
        assert_eq!(rendered.len(), fetch.len());
        assert_eq!(
            json[SlotKey::RealTimeData.as_str()]["intraday_prices_AAPL_5min"]["payload"]["bars"]
                .as_array()
                .unwrap()
                .len(),
            12
        );
        assert_eq!(
            json[SlotKey::RealTimeData.as_str()]["intraday_prices_AAPL_5min_2"]["payload"]["bars"]
                .as_array()
                .unwrap()
                .len(),
            24
        );
    }

    #[tokio::test]
    async fn test_fetch_failures_flow_forward() {
        let request = PipelineRequest::new("AAPL")
            .with_data_request(RequestItem::new("crypto_prices").param("symbol", "BTC"))
            .with_data_request(prices_request("AAPL", "fortnightly", 12))
            .with_data_request(economic_request("Non-Farm Payroll", "USA"))
            .with_pattern(kinds::TIME_OF_DAY_VOLATILITY);
        let ctx = standard().run(request).await.unwrap();

        let fetch = ctx.real_time_data().unwrap();
        assert_record_keys(
            fetch,
            &[
                "crypto_prices_BTC",
                "intraday_prices_AAPL_fortnightly",
                "economic_data_Non-Farm_Payroll_USA",
            ],
        );
        assert_eq!(fetch.failure_count(), 2);
        assert_entry_failure(fetch, "crypto_prices_BTC", ErrorKind::UnknownKind);
        assert_entry_success(fetch, "economic_data_Non-Farm_Payroll_USA");

        assert_entry_failure(
            ctx.pattern_recognition().unwrap(),
            kinds::TIME_OF_DAY_VOLATILITY,
            ErrorKind::InsufficientData,
        );
        let summary = ctx.analysis_summary().unwrap();
        assert!(summary.data_gaps.len() >= 3);
        assert!(ctx.strategy_proposals().unwrap().is_rejected());
    }

    #[tokio::test]
    async fn test_news_and_volatility_session() {
        let request = aapl_surge_request()
            .with_data_request(news_request(&["AAPL"], 5))
            .with_pattern(kinds::NEWS_CORRELATION)
            .with_pattern(kinds::TIME_OF_DAY_VOLATILITY);
        let ctx = standard().run(request).await.unwrap();

        let patterns = ctx.pattern_recognition().unwrap();
        assert_eq!(patterns.failure_count(), 0);
        assert_eq!(patterns.len(), 3);

        let summary = ctx.analysis_summary().unwrap();
        assert_eq!(summary.current_market_snapshot.news_headlines.len(), 5);

        let proposals = ctx.strategy_proposals().unwrap().proposals();
        assert!(!proposals.is_empty() && proposals.len() <= 2);
        assert_eq!(proposals[0].based_on_patterns[0], kinds::PRICE_VOLUME_SURGE);
    }

    #[tokio::test]
    async fn test_same_request_twice_is_deterministic() {
        let pipeline = standard();
        let a = pipeline.run(aapl_surge_request()).await.unwrap();
        let b = pipeline.run(aapl_surge_request()).await.unwrap();

        assert_eq!(a.real_time_data(), b.real_time_data());
        assert_eq!(a.pattern_recognition(), b.pattern_recognition());
        assert_eq!(a.strategy_proposals(), b.strategy_proposals());
        assert!(a.identity().same_request(b.identity()));
        assert_ne!(a.identity().session_id, b.identity().session_id);
    }

    #[tokio::test]
    async fn test_concurrent_dispatch_matches_sequential() {
        let request = aapl_surge_request()
            .with_data_request(prices_request("MSFT", "1min", 30))
            .with_data_request(news_request(&["AAPL", "iPhone"], 3))
            .with_pattern(kinds::TIME_OF_DAY_VOLATILITY);

        let sequential = standard().run(request.clone()).await.unwrap();
        let concurrent = quiet_pipeline(&PipelineConfig::default().with_dispatch_mode(DispatchMode::Concurrent))
            .run(request)
            .await
            .unwrap();

        assert_eq!(sequential.real_time_data(), concurrent.real_time_data());
        assert_eq!(sequential.pattern_recognition(), concurrent.pattern_recognition());
    }

    #[tokio::test]
    async fn test_lifecycle_events() {
        let sink = Arc::new(CollectingEventSink::new());
        let pipeline = IntradayPipeline::standard_builder(&PipelineConfig::default())
            .unwrap()
            .with_event_sink(sink.clone())
            .build()
            .unwrap();

        let ctx = pipeline.run(aapl_surge_request()).await.unwrap();

        let types = sink.event_types();
        assert_eq!(types.len(), 10);
        assert_eq!(types.first().map(String::as_str), Some(events::PIPELINE_STARTED));
        assert_eq!(types.last().map(String::as_str), Some(events::PIPELINE_COMPLETED));

        let completed = sink.events_of_type(events::STAGE_COMPLETED);
        let slots: Vec<&str> = completed
            .iter()
            .filter_map(|e| e.field("slot").and_then(|s| s.as_str()))
            .collect();
        assert_eq!(
            slots,
            vec![
                "real_time_data_output",
                "pattern_recognition_output",
                "intraday_analysis_summary",
                "intraday_strategy_proposals",
            ]
        );
        assert!(completed.iter().all(|e| e.field("duration_ms").is_some_and(|d| d.is_f64())));
        assert_eq!(completed[0].field("failures"), Some(&json!(0)));

        let session = json!(ctx.identity().session_id.to_string());
        assert!(sink.events().iter().all(|e| e.field("session_id") == Some(&session)));
        assert!(sink.events().iter().all(|e| e.field("ticker") == Some(&json!("AAPL"))));
    }

    #[tokio::test]
    async fn test_failures_counted_in_stage_events() {
        let sink = Arc::new(CollectingEventSink::new());
        let pipeline = IntradayPipeline::standard_builder(&PipelineConfig::default())
            .unwrap()
            .with_event_sink(sink.clone())
            .build()
            .unwrap();
        let request = PipelineRequest::new("AAPL").with_pattern("unsupported_pattern");

        pipeline.run(request).await.unwrap();

        let completed = sink.events_of_type(events::STAGE_COMPLETED);
        assert_eq!(completed[1].field("failures"), Some(&json!(1)));
        assert_eq!(completed[3].field("failures"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_strict_inputs_reject_undeclared_read() {
        let sneaky = Arc::new(FnStage::new("sneaky", SlotKey::PatternRecognition, |inputs| {
            inputs.record(SlotKey::RealTimeData)?;
            Ok(SlotValue::Record(StageOutputRecord::new()))
        }));
        let producer = Arc::new(FnStage::new("producer", SlotKey::RealTimeData, |_| {
            Ok(SlotValue::Record(StageOutputRecord::new()))
        }));

        let strict = PipelineBuilder::new("strict")
            .stage(producer.clone())
            .stage(sneaky.clone())
            .with_event_sink(Arc::new(events::NoOpEventSink))
            .build()
            .unwrap();
        let err = strict.run(PipelineRequest::new("AAPL")).await.unwrap_err();
        assert!(matches!(
            err,
            IntraflowError::UndeclaredSlot(ref e) if e.stage == "sneaky" && e.slot == SlotKey::RealTimeData
        ));

        let lenient = PipelineBuilder::new("lenient")
            .stage(producer)
            .stage(sneaky)
            .with_strict_inputs(false)
            .with_event_sink(Arc::new(events::NoOpEventSink))
            .build()
            .unwrap();
        assert!(lenient.run(PipelineRequest::new("AAPL")).await.is_ok());
    }

    #[tokio::test]
    async fn test_declared_inputs_pass_strict_mode() {
        let reader = FnStage::new("reader", SlotKey::PatternRecognition, |inputs| {
            let upstream = inputs.record(SlotKey::RealTimeData)?.cloned().unwrap_or_default();
            Ok(SlotValue::Record(upstream))
        })
        .with_inputs([SlotInput::required(SlotKey::RealTimeData)]);
        let producer = FnStage::new("producer", SlotKey::RealTimeData, |_| {
            Ok(SlotValue::Record(StageOutputRecord::new()))
        });

        let pipeline = PipelineBuilder::new("declared")
            .stage(Arc::new(producer))
            .stage(Arc::new(reader))
            .with_event_sink(Arc::new(events::NoOpEventSink))
            .build()
            .unwrap();
        let ctx = pipeline.run(PipelineRequest::new("AAPL")).await.unwrap();
        assert_slots_written(&ctx, &[SlotKey::RealTimeData, SlotKey::PatternRecognition]);
    }

    #[test]
    fn test_extra_strategy_stage_conflicts() {
        let extra = Arc::new(FnStage::new("second_opinion", SlotKey::StrategyProposals, |inputs| {
            Ok(SlotValue::Strategy(StrategyOutcome::insufficient_analysis(inputs.ticker(), "")))
        }));
        let err = IntradayPipeline::standard_builder(&PipelineConfig::default())
            .unwrap()
            .stage(extra)
            .build()
            .unwrap_err();

        assert_eq!(err.code(), Some("PIPELINE-001-SLOT_CONFLICT"));
        assert_eq!(err.stages, vec!["strategize".to_string(), "second_opinion".to_string()]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = IntradayPipeline::standard(&PipelineConfig::default().with_max_proposals(5)).unwrap_err();
        assert!(matches!(err, IntraflowError::Config(_)));
    }

    #[test]
    fn test_standard_stage_order() {
        assert_eq!(
            standard().stage_names(),
            vec!["fetch", "recognize", "summarize", "strategize"]
        );
    }

    #[tokio::test]
    async fn test_json_request_end_to_end() {
        let request = PipelineRequest::from_json_str(
            r#"{
                "ticker": "AAPL",
                "data_requests": [
                    {"type": "intraday_prices", "ticker": "AAPL", "interval": "5min", "count": 12},
                    {"type": "news_feed", "keywords": ["AAPL"], "max_articles": 4}
                ],
                "patterns_to_detect": ["price_volume_surge", "unsupported_pattern"],
                "user_intraday_risk_tolerance": "high",
                "user_intraday_goals": "scalp profits"
            }"#,
        )
        .unwrap();

        let ctx = standard().run(request).await.unwrap();
        let json = ctx.to_json();

        for slot in SlotKey::ALL {
            assert!(json.get(slot.as_str()).is_some(), "missing {slot}");
        }
        assert_eq!(json["session"]["ticker"], json!("AAPL"));
        assert_eq!(
            json["pattern_recognition_output"]["unsupported_pattern"]["reason"],
            json!("UnknownKind")
        );
        assert!(json["intraday_strategy_proposals"].is_array());
    }

    #[test]
    fn test_run_blocks_on_future() {
        let ctx = tokio_test::block_on(standard().run(PipelineRequest::new("AAPL"))).unwrap();
        assert!(ctx.strategy_proposals().unwrap().is_rejected());
    }
}
