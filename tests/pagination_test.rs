mod common;

#[cfg(test)]
mod next_page {
    use immoscrape::pagination::{reached_end, resolve_next, synthesize_next, PaginationMode};

    #[test]
    fn appends_page_two() {
        assert_eq!(
            synthesize_next("https://www.immoweb.be/en/search/apartment/for-sale/etterbeek/1040"),
            "https://www.immoweb.be/en/search/apartment/for-sale/etterbeek/1040?page=2"
        );
        assert_eq!(
            synthesize_next("https://www.immoweb.be/en/search?maxPrice=300000"),
            "https://www.immoweb.be/en/search?maxPrice=300000&page=2"
        );
    }

    #[test]
    fn bumps_existing_page_number() {
        assert_eq!(
            synthesize_next("https://www.immoweb.be/en/search?page=9&orderBy=relevance"),
            "https://www.immoweb.be/en/search?page=10&orderBy=relevance"
        );
    }

    #[test]
    fn explicit_link_wins_and_is_absolute() {
        let next = resolve_next(
            "https://www.immoweb.be/en/search?page=1",
            Some("/en/search?page=2&cursor=abc"),
        );

        assert_eq!(next.mode, PaginationMode::ExplicitLink);
        assert_eq!(next.url, "https://www.immoweb.be/en/search?page=2&cursor=abc");
    }

    #[test]
    fn blank_href_counts_as_missing() {
        let next = resolve_next("https://www.immoweb.be/en/search?page=4", Some("  "));

        assert_eq!(next.mode, PaginationMode::Synthesized);
        assert_eq!(next.url, "https://www.immoweb.be/en/search?page=5");
    }

    #[test]
    fn end_only_for_empty_synthesized_follow_up_pages() {
        let paged = "https://www.immoweb.be/en/search?page=3";
        let first = "https://www.immoweb.be/en/search";

        assert!(reached_end(PaginationMode::Synthesized, paged, 3, 0));
        assert!(!reached_end(PaginationMode::Synthesized, paged, 3, 1));
        assert!(!reached_end(PaginationMode::ExplicitLink, paged, 3, 0));
        assert!(!reached_end(PaginationMode::Synthesized, first, 3, 0));
        assert!(!reached_end(PaginationMode::Synthesized, paged, 1, 0));
    }
}

#[cfg(test)]
mod walker {
    use futures::TryStreamExt;
    use immoscrape::{
        config,
        driver::{fixture::DETACHED_ATTR, FixtureDriver},
        pagination::{PageBatch, PaginationMode, PaginationWalker},
    };

    use crate::common::{card, empty_page, results_page, SEARCH_URL, SEARCH_URL_PAGE_2};

    const SEARCH_URL_PAGE_3: &str =
        "https://www.immoweb.be/en/search/apartment/for-sale/etterbeek/1040?countries=BE&maxPrice=300000&orderBy=relevance&page=3";

    fn cards(ids: &[u64]) -> Vec<String> {
        ids.iter()
            .map(|id| card(*id, "Apartment", "€250,000", "2 bedrooms 80 m²"))
            .collect()
    }

    async fn walk(driver: &mut FixtureDriver, max_pages: usize) -> anyhow::Result<Vec<PageBatch>> {
        let config = config::create_test_config();
        PaginationWalker::new(driver, &config, SEARCH_URL, max_pages)
            .into_stream()
            .try_collect()
            .await
    }

    #[tokio::test]
    async fn explicit_link_then_empty_page_visits_two_pages() {
        let mut driver = FixtureDriver::new()
            .page(
                SEARCH_URL,
                &results_page(&cards(&[1000001, 1000002, 1000003]), Some(SEARCH_URL_PAGE_2)),
            )
            .page(SEARCH_URL_PAGE_2, &empty_page());

        let batches = walk(&mut driver, 10).await.unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].cards.len(), 3);
        assert_eq!(
            batches[0].next.as_ref().map(|next| next.mode),
            Some(PaginationMode::ExplicitLink)
        );
        assert_eq!(batches[1].matched(), 0);
        assert!(batches[1].next.is_none());
        assert_eq!(driver.visited(), &[SEARCH_URL, SEARCH_URL_PAGE_2]);
    }

    #[tokio::test]
    async fn synthesized_pages_until_results_run_out() {
        let mut driver = FixtureDriver::new()
            .page(SEARCH_URL, &results_page(&cards(&[1000001]), None))
            .page(SEARCH_URL_PAGE_2, &results_page(&cards(&[1000002]), None))
            .page(SEARCH_URL_PAGE_3, &empty_page());

        let batches = walk(&mut driver, 10).await.unwrap();

        let numbers: Vec<usize> = batches.iter().map(|batch| batch.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(
            batches[0].next.as_ref().map(|next| next.mode),
            Some(PaginationMode::Synthesized)
        );
        assert_eq!(driver.visited(), &[SEARCH_URL, SEARCH_URL_PAGE_2, SEARCH_URL_PAGE_3]);
    }

    #[tokio::test]
    async fn empty_first_page_does_not_end_the_walk() {
        let mut driver = FixtureDriver::new()
            .page(SEARCH_URL, &empty_page())
            .page(SEARCH_URL_PAGE_2, &empty_page());

        let batches = walk(&mut driver, 10).await.unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(driver.visited(), &[SEARCH_URL, SEARCH_URL_PAGE_2]);
    }

    #[tokio::test]
    async fn page_cap_is_respected() {
        let mut driver = FixtureDriver::new()
            .page(SEARCH_URL, &results_page(&cards(&[1000001]), Some(SEARCH_URL_PAGE_2)))
            .page(SEARCH_URL_PAGE_2, &results_page(&cards(&[1000002]), Some(SEARCH_URL_PAGE_3)))
            .page(SEARCH_URL_PAGE_3, &results_page(&cards(&[1000003]), None));

        let batches = walk(&mut driver, 2).await.unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(driver.visited(), &[SEARCH_URL, SEARCH_URL_PAGE_2]);
    }

    #[tokio::test]
    async fn single_page_cap() {
        let mut driver = FixtureDriver::new()
            .page(SEARCH_URL, &results_page(&cards(&[1000001]), Some(SEARCH_URL_PAGE_2)));

        let batches = walk(&mut driver, 1).await.unwrap();

        assert_eq!(batches.len(), 1);
        assert_eq!(driver.visited(), &[SEARCH_URL]);
    }

    #[tokio::test]
    async fn transient_load_failure_is_retried() {
        let mut driver = FixtureDriver::new()
            .page(SEARCH_URL, &results_page(&cards(&[1000001]), None))
            .page(SEARCH_URL_PAGE_2, &empty_page())
            .failing(SEARCH_URL, 1);

        let batches = walk(&mut driver, 10).await.unwrap();

        assert_eq!(batches[0].cards.len(), 1);
        assert_eq!(driver.visited(), &[SEARCH_URL, SEARCH_URL_PAGE_2]);
    }

    #[tokio::test]
    async fn exhausted_retries_fail_the_walk() {
        let mut driver = FixtureDriver::new()
            .page(SEARCH_URL, &results_page(&cards(&[1000001]), None))
            .failing(SEARCH_URL, 2);

        let err = walk(&mut driver, 10).await.unwrap_err();

        let message = format!("{:#}", err);
        assert!(message.contains("after 2 attempt(s)"), "{}", message);
        assert!(message.contains("connection reset"), "{}", message);
        assert!(driver.visited().is_empty());
    }

    #[tokio::test]
    async fn consent_banner_is_clicked_once_per_page() {
        let mut driver = FixtureDriver::new()
            .page(SEARCH_URL, &results_page(&cards(&[1000001]), Some(SEARCH_URL_PAGE_2)))
            .page(SEARCH_URL_PAGE_2, &empty_page());

        walk(&mut driver, 10).await.unwrap();

        assert_eq!(driver.consent_clicks(), 2);
    }

    #[tokio::test]
    async fn broken_consent_banner_is_ignored() {
        let mut driver = FixtureDriver::new()
            .page(SEARCH_URL, &results_page(&cards(&[1000001, 1000002]), None))
            .with_broken_consent(SEARCH_URL)
            .page(SEARCH_URL_PAGE_2, &empty_page());

        let batches = walk(&mut driver, 10).await.unwrap();

        assert_eq!(batches[0].cards.len(), 2);
        assert_eq!(driver.consent_clicks(), 1);
    }

    #[tokio::test]
    async fn late_cards_are_found_after_network_idle() {
        let mut driver = FixtureDriver::new()
            .page_after_idle(
                SEARCH_URL,
                &empty_page(),
                &results_page(&cards(&[1000001, 1000002]), None),
            )
            .page(SEARCH_URL_PAGE_2, &empty_page());

        let batches = walk(&mut driver, 10).await.unwrap();

        assert_eq!(batches[0].cards.len(), 2);
        assert_eq!(batches.len(), 2);
    }

    #[tokio::test]
    async fn detached_card_is_skipped() {
        let mut page_cards = cards(&[1000001, 1000002, 1000003]);
        page_cards[1] = page_cards[1].replacen(
            r#"data-item="result""#,
            &format!(r#"data-item="result" {DETACHED_ATTR}="true""#),
            1,
        );

        let mut driver = FixtureDriver::new()
            .page(SEARCH_URL, &results_page(&page_cards, None))
            .page(SEARCH_URL_PAGE_2, &empty_page());

        let batches = walk(&mut driver, 10).await.unwrap();

        assert_eq!(batches[0].cards.len(), 2);
        assert_eq!(batches[0].skipped, 1);
        assert_eq!(batches[0].matched(), 3);
    }

    #[tokio::test]
    async fn stale_next_link_falls_back_to_synthesized() {
        let mut driver = FixtureDriver::new()
            .page(SEARCH_URL, &results_page(&cards(&[1000001]), Some(SEARCH_URL_PAGE_2)))
            .page(SEARCH_URL_PAGE_2, &results_page(&cards(&[1000002]), Some(SEARCH_URL)))
            .page(SEARCH_URL_PAGE_3, &empty_page());

        let batches = walk(&mut driver, 10).await.unwrap();

        assert_eq!(
            batches[1].next.as_ref().map(|next| next.mode),
            Some(PaginationMode::Synthesized)
        );
        assert_eq!(driver.visited(), &[SEARCH_URL, SEARCH_URL_PAGE_2, SEARCH_URL_PAGE_3]);
    }

    #[tokio::test]
    async fn walker_cursor_tracks_progress() {
        let mut driver = FixtureDriver::new()
            .page(SEARCH_URL, &results_page(&cards(&[1000001]), Some(SEARCH_URL_PAGE_2)))
            .page(SEARCH_URL_PAGE_2, &empty_page());
        let config = config::create_test_config();

        let mut walker = PaginationWalker::new(&mut driver, &config, SEARCH_URL, 10);
        assert_eq!(walker.cursor().pages_visited(), 0);

        walker.next_batch().await.unwrap();
        assert_eq!(walker.cursor().pages_visited(), 1);
        assert_eq!(walker.cursor().url(), SEARCH_URL_PAGE_2);

        walker.next_batch().await.unwrap();
        assert!(walker.is_finished());
        assert!(walker.next_batch().await.unwrap().is_none());
    }
}
