use super::*;
use pretty_assertions::assert_eq;
use tabula_core::{ColumnDescriptor, Value};
use tabula_table::TableStatus;

fn stars() -> TableModel {
    TableModel::new(
        "stars",
        vec![ColumnDescriptor::text("name"), ColumnDescriptor::float("mag")],
        (0..10)
            .map(|i| vec![Value::from(format!("s{i}")), Value::from(i as f64)])
            .collect(),
    )
}

fn store_with(table: TableModel) -> TableStore {
    let mut store = TableStore::new(EngineConfig::default());
    store.dispatch(TableEvent::Insert(table));
    store
}

fn names(table: &TableModel) -> Vec<String> {
    table
        .column_values("name")
        .into_iter()
        .map(|v| v.to_string())
        .collect()
}

#[cfg(test)]
mod client_table_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_creates_client_view() {
        let mut store = TableStore::new(EngineConfig::default());
        let reduction = store.dispatch(TableEvent::Insert(stars()));

        assert_eq!(reduction.changed, vec!["stars".to_string()]);
        assert!(reduction.effects.is_empty());
        let table = store.table("stars").unwrap();
        assert!(table.is_client_table());
        assert_eq!(table.total_rows, 10);
        assert_eq!(table.status(), TableStatus::Complete);
    }

    #[test]
    fn test_filter_recomputes_locally() {
        let mut store = store_with(stars());
        let reduction = store.dispatch(TableEvent::Filter {
            tbl_id: "stars".into(),
            filters: "mag > 6".into(),
        });

        assert!(reduction.effects.is_empty());
        let table = store.table("stars").unwrap();
        assert_eq!(table.total_rows, 3);
        assert_eq!(names(table), vec!["s7", "s8", "s9"]);
        assert_eq!(table.original.as_ref().map(|o| o.total_rows), Some(10));
    }

    #[test]
    fn test_selection_survives_filter_and_sort() {
        let mut store = store_with(stars());
        store.dispatch(TableEvent::Select {
            tbl_id: "stars".into(),
            change: SelectChange::Row { index: 2, selected: true },
        });
        let original = store.table("stars").and_then(|t| t.original.as_deref()).unwrap();
        assert_eq!(original.selection.all_selected_indices(), vec![2]);

        store.dispatch(TableEvent::Filter {
            tbl_id: "stars".into(),
            filters: "mag >= 0".into(),
        });
        assert_eq!(store.table("stars").unwrap().selection.all_selected_indices(), vec![2]);

        store.dispatch(TableEvent::Sort {
            tbl_id: "stars".into(),
            sort_info: "DESC,mag".into(),
        });
        assert_eq!(store.table("stars").unwrap().selection.all_selected_indices(), vec![7]);
    }

    fn many_stars(count: i64) -> TableModel {
        TableModel::new(
            "stars",
            vec![ColumnDescriptor::text("name"), ColumnDescriptor::float("mag")],
            (0..count)
                .map(|i| vec![Value::from(format!("s{i}")), Value::from(i as f64)])
                .collect(),
        )
    }

    #[test]
    fn test_select_all_on_paged_view_covers_unloaded_pages() {
        let mut store = store_with(many_stars(250));
        store.dispatch(TableEvent::Load(
            TableRequest::new("stars").with_filters("mag >= 0").with_page(0, 100),
        ));
        assert_eq!(store.table("stars").unwrap().rows.len(), 100);

        store.dispatch(TableEvent::Select {
            tbl_id: "stars".into(),
            change: SelectChange::All(true),
        });
        store.dispatch(TableEvent::Sort {
            tbl_id: "stars".into(),
            sort_info: "DESC,mag".into(),
        });

        let table = store.table("stars").unwrap();
        assert_eq!(table.total_rows, 250);
        assert_eq!(table.selection.selected_count(), 250);
    }

    #[test]
    fn test_replace_on_paged_view_reaches_filtered_rows_only() {
        let mut store = store_with(many_stars(250));
        store.dispatch(TableEvent::Load(
            TableRequest::new("stars").with_filters("mag >= 100").with_page(0, 50),
        ));
        let mut selection = store.table("stars").unwrap().selection.clone();
        selection.set_all(true);
        selection.set_row(120, false);
        store.dispatch(TableEvent::Select {
            tbl_id: "stars".into(),
            change: SelectChange::Replace(selection),
        });

        let original = store.table("stars").and_then(|t| t.original.as_deref()).unwrap();
        assert_eq!(original.selection.selected_count(), 149);
        assert!(!original.selection.is_selected(99));
        assert!(original.selection.is_selected(100));
        assert!(!original.selection.is_selected(220));
        assert!(original.selection.is_selected(249));
    }

    #[test]
    fn test_select_on_filtered_view_reaches_original() {
        let mut store = store_with(stars());
        store.dispatch(TableEvent::Filter {
            tbl_id: "stars".into(),
            filters: "mag > 4".into(),
        });
        store.dispatch(TableEvent::Select {
            tbl_id: "stars".into(),
            change: SelectChange::Row { index: 0, selected: true },
        });

        let table = store.table("stars").unwrap();
        assert_eq!(table.selection.all_selected_indices(), vec![0]);
        let original = table.original.as_deref().unwrap();
        assert_eq!(original.selection.all_selected_indices(), vec![5]);
    }

    #[test]
    fn test_highlight_within_and_outside_page() {
        let mut store = store_with(stars());
        store.dispatch(TableEvent::Load(TableRequest::new("stars").with_page(0, 4)));
        assert_eq!(store.table("stars").unwrap().rows.len(), 4);

        let reduction = store.dispatch(TableEvent::Highlight {
            tbl_id: "stars".into(),
            row: 3,
        });
        assert!(reduction.effects.is_empty());
        assert_eq!(store.table("stars").unwrap().highlighted_row, 3);

        let reduction = store.dispatch(TableEvent::Highlight {
            tbl_id: "stars".into(),
            row: 6,
        });
        assert!(reduction.effects.is_empty());
        let table = store.table("stars").unwrap();
        assert_eq!(table.highlighted_row, 6);
        assert_eq!(table.request.start_idx, 4);
        assert_eq!(names(table), vec!["s4", "s5", "s6", "s7"]);
    }

    #[test]
    fn test_repeated_highlight_is_a_no_op() {
        let mut store = store_with(stars());
        store.dispatch(TableEvent::Highlight {
            tbl_id: "stars".into(),
            row: 2,
        });
        let reduction = store.dispatch(TableEvent::Highlight {
            tbl_id: "stars".into(),
            row: 2,
        });
        assert!(reduction.is_empty());
    }

    #[test]
    fn test_filter_and_sort_keep_highlighted_row() {
        let mut store = store_with(stars());
        store.dispatch(TableEvent::Highlight {
            tbl_id: "stars".into(),
            row: 7,
        });

        store.dispatch(TableEvent::Filter {
            tbl_id: "stars".into(),
            filters: "mag > 5".into(),
        });
        assert_eq!(store.table("stars").unwrap().highlighted_row, 1);

        store.dispatch(TableEvent::Sort {
            tbl_id: "stars".into(),
            sort_info: "DESC,mag".into(),
        });
        assert_eq!(store.table("stars").unwrap().highlighted_row, 2);
    }

    #[test]
    fn test_bad_filter_puts_table_in_error() {
        let mut store = store_with(stars());
        let reduction = store.dispatch(TableEvent::Filter {
            tbl_id: "stars".into(),
            filters: "mag > abc".into(),
        });

        assert!(reduction.effects.is_empty());
        let table = store.table("stars").unwrap();
        assert_eq!(table.status(), TableStatus::Error);
        assert!(table.is_client_table());
    }

    #[test]
    fn test_update_merges_meta() {
        let mut store = store_with(stars());
        let meta = Tree::record([("source", Tree::leaf("gaia"))]);

        let first = store.dispatch(TableEvent::Update {
            tbl_id: "stars".into(),
            meta: meta.clone(),
        });
        assert_eq!(first.changed, vec!["stars".to_string()]);
        assert_eq!(
            store.table("stars").unwrap().meta.get_path("source"),
            Some(&Value::from("gaia"))
        );

        let again = store.dispatch(TableEvent::Update {
            tbl_id: "stars".into(),
            meta,
        });
        assert!(again.is_empty());
    }
}

#[cfg(test)]
mod server_table_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_chart::{AxisParams, XyPlotParams};

    fn server_page(request: &TableRequest, total: u64, names: &[&str]) -> TableModel {
        let mut page = TableModel::new(
            request.tbl_id.clone(),
            vec![ColumnDescriptor::text("name")],
            names.iter().map(|n| vec![Value::from(*n)]).collect(),
        );
        page.total_rows = total;
        page.request = request.clone();
        page
    }

    fn only_fetch(reduction: &Reduction) -> FetchTicket {
        match reduction.effects.as_slice() {
            [Effect::Fetch(ticket)] => ticket.clone(),
            other => panic!("expected one fetch, got {other:?}"),
        }
    }

    fn issued_fetch(store: &mut TableStore, request: TableRequest) -> FetchTicket {
        only_fetch(&store.dispatch(TableEvent::Load(request)))
    }

    fn complete(
        store: &mut TableStore,
        ticket: &FetchTicket,
        total: u64,
        names: &[&str],
    ) -> Reduction {
        store.dispatch(TableEvent::FetchComplete {
            table: server_page(&ticket.request, total, names),
            ticket: ticket.clone(),
        })
    }

    #[test]
    fn test_load_emits_fetch() {
        let mut store = TableStore::new(EngineConfig::default());
        let ticket = issued_fetch(&mut store, TableRequest::new("srv").with_page(0, 50));

        assert_eq!(ticket.request.page_size, 50);
        assert_eq!(store.table("srv").unwrap().status(), TableStatus::Loading);
        assert!(store.latest().is_current(&ticket));
    }

    #[test]
    fn test_missing_page_size_is_fixed() {
        let mut store = TableStore::new(EngineConfig::default());
        let ticket = issued_fetch(&mut store, TableRequest::new("srv"));
        assert_eq!(ticket.request.page_size, store.config().max_row);
    }

    #[test]
    fn test_fetch_complete_applies() {
        let mut store = TableStore::new(EngineConfig::default());
        let ticket = issued_fetch(&mut store, TableRequest::new("srv").with_page(0, 2));

        complete(&mut store, &ticket, 40, &["a", "b"]);

        let table = store.table("srv").unwrap();
        assert_eq!(table.status(), TableStatus::Complete);
        assert_eq!(table.total_rows, 40);
        assert!(!table.is_client_table());
        assert_eq!(table.selection.row_count(), 40);
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut store = TableStore::new(EngineConfig::default());
        let t1 = issued_fetch(&mut store, TableRequest::new("srv").with_filters("name = 'a'"));
        let t2 = issued_fetch(&mut store, TableRequest::new("srv").with_filters("name = 'b'"));

        complete(&mut store, &t2, 1, &["b"]);
        let late = complete(&mut store, &t1, 1, &["a"]);

        assert!(late.is_empty());
        let table = store.table("srv").unwrap();
        assert_eq!(names(table), vec!["b"]);
        assert_eq!(table.request, t2.request);
    }

    #[test]
    fn test_superseded_result_arriving_first_is_discarded() {
        let mut store = TableStore::new(EngineConfig::default());
        let t1 = issued_fetch(&mut store, TableRequest::new("srv").with_filters("name = 'a'"));
        let t2 = issued_fetch(&mut store, TableRequest::new("srv").with_filters("name = 'b'"));

        let early = complete(&mut store, &t1, 1, &["a"]);
        assert!(early.is_empty());
        assert_eq!(store.table("srv").unwrap().status(), TableStatus::Loading);

        complete(&mut store, &t2, 1, &["b"]);
        assert_eq!(names(store.table("srv").unwrap()), vec!["b"]);
    }

    #[test]
    fn test_reissued_identical_request_discards_earlier_answer() {
        let mut store = TableStore::new(EngineConfig::default());
        let request = TableRequest::new("srv").with_page(0, 10);
        let first = issued_fetch(&mut store, request.clone());
        let second = issued_fetch(&mut store, request);
        assert_eq!(first.request, second.request);

        let early = complete(&mut store, &first, 1, &["old"]);
        assert!(early.is_empty());
        assert_eq!(store.table("srv").unwrap().status(), TableStatus::Loading);

        complete(&mut store, &second, 1, &["new"]);
        assert_eq!(names(store.table("srv").unwrap()), vec!["new"]);
    }

    #[test]
    fn test_fetch_error() {
        let mut store = TableStore::new(EngineConfig::default());
        let t1 = issued_fetch(&mut store, TableRequest::new("srv").with_page(0, 10));
        let t2 = issued_fetch(&mut store, TableRequest::new("srv").with_page(0, 20));

        let stale = store.dispatch(TableEvent::FetchError {
            ticket: t1,
            error: FetchFailure::new("boom", "boom"),
        });
        assert!(stale.is_empty());

        store.dispatch(TableEvent::FetchError {
            ticket: t2,
            error: FetchFailure::new("Cannot display requested data", "invalid column"),
        });
        let table = store.table("srv").unwrap();
        assert_eq!(table.status(), TableStatus::Error);
        assert_eq!(table.error.as_ref().map(|e| e.reason.as_str()), Some("invalid column"));
    }

    #[test]
    fn test_highlight_outside_page_fetches_its_page() {
        let mut store = TableStore::new(EngineConfig::default());
        let ticket = issued_fetch(&mut store, TableRequest::new("srv").with_page(0, 50));
        complete(&mut store, &ticket, 200, &["a"; 50]);

        let next = fetch_for_highlight(&mut store, 130);
        assert_eq!(next.request.start_idx, 100);
        assert_eq!(next.request.highlighted_row, Some(130));

        complete(&mut store, &next, 200, &["b"; 50]);
        let table = store.table("srv").unwrap();
        assert_eq!(table.highlighted_row, 130);
        assert_eq!(table.page_start(), 100);
    }

    fn fetch_for_highlight(store: &mut TableStore, row: i64) -> FetchTicket {
        only_fetch(&store.dispatch(TableEvent::Highlight {
            tbl_id: "srv".into(),
            row,
        }))
    }

    #[test]
    fn test_paging_keeps_selection_but_filtering_resets_it() {
        let mut store = TableStore::new(EngineConfig::default());
        let ticket = issued_fetch(&mut store, TableRequest::new("srv").with_page(0, 50));
        complete(&mut store, &ticket, 100, &["a"; 50]);
        store.dispatch(TableEvent::Select {
            tbl_id: "srv".into(),
            change: SelectChange::Row { index: 3, selected: true },
        });

        let next = fetch_for_highlight(&mut store, 60);
        complete(&mut store, &next, 100, &["b"; 50]);
        assert_eq!(store.table("srv").unwrap().selection.all_selected_indices(), vec![3]);

        let filtered = only_fetch(&store.dispatch(TableEvent::Filter {
            tbl_id: "srv".into(),
            filters: "name = 'a'".into(),
        }));
        assert_eq!(filtered.request.start_idx, 0);
        complete(&mut store, &filtered, 100, &["a"; 50]);
        assert_eq!(store.table("srv").unwrap().selection.selected_count(), 0);
    }

    #[test]
    fn test_remove_forgets_in_flight_fetch() {
        let mut store = TableStore::new(EngineConfig::default());
        let ticket = issued_fetch(&mut store, TableRequest::new("srv"));

        let removed = store.dispatch(TableEvent::Remove { tbl_id: "srv".into() });
        assert_eq!(removed.changed, vec!["srv".to_string()]);

        let late = complete(&mut store, &ticket, 1, &["a"]);
        assert!(late.is_empty());
        assert!(store.table("srv").is_none());
    }

    fn plot(x: &str, y: &str) -> Option<XyPlotParams> {
        Some(XyPlotParams::new(AxisParams::new(x), AxisParams::new(y)))
    }

    fn set_plot(store: &mut TableStore, params: Option<XyPlotParams>) -> Reduction {
        store.dispatch(TableEvent::PlotParams {
            chart_id: "c1".into(),
            tbl_id: "srv".into(),
            params,
        })
    }

    fn server_table(store: &mut TableStore, total: u64) {
        let ticket = issued_fetch(store, TableRequest::new("srv").with_page(0, 50));
        complete(store, &ticket, total, &["a"; 50]);
    }

    #[test]
    fn test_plot_fetches_once_for_unchanged_params() {
        let mut store = TableStore::new(EngineConfig::default());
        server_table(&mut store, 100);

        let first = only_fetch(&set_plot(&mut store, plot("ra", "dec")));
        assert_ne!(first.request.tbl_id, "srv");
        assert_eq!(first.request.start_idx, 0);

        assert!(set_plot(&mut store, plot("ra", "dec")).is_empty());

        let moved = only_fetch(&set_plot(&mut store, plot("ra", "mag")));
        assert_eq!(moved.request.tbl_id, first.request.tbl_id);
        assert!(!store.latest().is_current(&first));
    }

    #[test]
    fn test_chart_data_for_superseded_params_is_discarded() {
        let mut store = TableStore::new(EngineConfig::default());
        server_table(&mut store, 100);

        let first = only_fetch(&set_plot(&mut store, plot("ra", "dec")));
        let second = only_fetch(&set_plot(&mut store, plot("ra", "mag")));

        assert!(complete(&mut store, &first, 1, &["old"]).is_empty());
        let applied = complete(&mut store, &second, 1, &["new"]);
        assert_eq!(applied.changed, vec![second.request.tbl_id.clone()]);

        // the data now matches the current params, so nothing is refetched
        assert!(set_plot(&mut store, plot("ra", "mag")).is_empty());
    }

    #[test]
    fn test_clearing_plot_drops_its_data() {
        let mut store = TableStore::new(EngineConfig::default());
        server_table(&mut store, 100);
        let ticket = only_fetch(&set_plot(&mut store, plot("ra", "dec")));
        complete(&mut store, &ticket, 1, &["x"]);
        assert!(store.table(&ticket.request.tbl_id).is_some());

        let cleared = set_plot(&mut store, None);
        assert_eq!(cleared.changed, vec![ticket.request.tbl_id.clone()]);
        assert!(store.table(&ticket.request.tbl_id).is_none());

        // a plot set again must fetch afresh
        assert_eq!(set_plot(&mut store, plot("ra", "dec")).effects.len(), 1);
    }

    #[test]
    fn test_plot_for_unknown_table_is_ignored() {
        let mut store = TableStore::new(EngineConfig::default());
        assert!(set_plot(&mut store, plot("ra", "dec")).is_empty());
    }
}

#[cfg(test)]
mod link_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(loaded: i64, total: u64) -> TableModel {
        let mut table = TableModel::new(
            "raw",
            vec![ColumnDescriptor::int("ROWID"), ColumnDescriptor::float("flux")],
            (0..loaded)
                .map(|i| vec![Value::from(i), Value::from(i as f64 * 2.0)])
                .collect(),
        );
        table.total_rows = total;
        table.selection = SelectionSet::new(total);
        table
    }

    fn folded(order: &[i64]) -> TableModel {
        TableModel::new(
            "folded",
            vec![ColumnDescriptor::int("RAW_ROWID"), ColumnDescriptor::float("phase")],
            order
                .iter()
                .enumerate()
                .map(|(i, &r)| vec![Value::from(r), Value::from(i as f64 / 10.0)])
                .collect(),
        )
    }

    fn linked_store(raw: TableModel, folded: TableModel) -> TableStore {
        let mut store = TableStore::new(EngineConfig::default());
        store.dispatch(TableEvent::Insert(raw));
        store.dispatch(TableEvent::Insert(folded));
        store.link(IdentityLink::new("raw", "ROWID", "folded", "RAW_ROWID"));
        store
    }

    #[test]
    fn test_highlight_follows_identity() {
        let mut store = linked_store(raw(5, 5), folded(&[4, 2, 0, 3, 1]));

        let reduction = store.dispatch(TableEvent::Highlight {
            tbl_id: "folded".into(),
            row: 1,
        });

        assert_eq!(reduction.changed, vec!["folded".to_string(), "raw".to_string()]);
        assert_eq!(store.table("raw").unwrap().highlighted_row, 2);

        store.dispatch(TableEvent::Highlight {
            tbl_id: "raw".into(),
            row: 3,
        });
        assert_eq!(store.table("folded").unwrap().highlighted_row, 3);
    }

    #[test]
    fn test_highlight_into_partial_table_asks_for_lookup() {
        let mut store = linked_store(raw(3, 50), folded(&[40, 41, 1]));

        let reduction = store.dispatch(TableEvent::Highlight {
            tbl_id: "folded".into(),
            row: 1,
        });

        assert_eq!(
            reduction.effects,
            vec![Effect::FindIndex {
                tbl_id: "raw".into(),
                filter: "ROWID = 41".into()
            }]
        );
    }

    #[test]
    fn test_selection_pushed_to_source() {
        let mut store = linked_store(raw(5, 5), folded(&[4, 2, 0, 3, 1]));

        let reduction = store.dispatch(TableEvent::Select {
            tbl_id: "folded".into(),
            change: SelectChange::Row { index: 0, selected: true },
        });

        assert!(reduction.changed.contains(&"raw".to_string()));
        let raw = store.table("raw").unwrap();
        assert_eq!(raw.selection.all_selected_indices(), vec![4]);
        assert_eq!(
            raw.original.as_deref().map(|o| o.selection.all_selected_indices()),
            Some(vec![4])
        );
    }

    #[test]
    fn test_selection_pulled_into_derived() {
        let mut store = linked_store(raw(5, 5), folded(&[4, 2, 0, 3, 1]));

        store.dispatch(TableEvent::Select {
            tbl_id: "raw".into(),
            change: SelectChange::Row { index: 2, selected: true },
        });

        assert_eq!(store.table("folded").unwrap().selection.all_selected_indices(), vec![1]);
    }

    #[test]
    fn test_remove_drops_links() {
        let mut store = linked_store(raw(5, 5), folded(&[4, 2, 0, 3, 1]));
        store.dispatch(TableEvent::Remove { tbl_id: "raw".into() });
        assert!(store.links().is_empty());
    }
}
