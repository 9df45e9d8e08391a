use super::*;
use crate::model::TableStatus;
use pretty_assertions::assert_eq;

fn create_test_table() -> TableModel {
    TableModel::new(
        "raw",
        vec![ColumnDescriptor::text("c1"), ColumnDescriptor::float("c2"), ColumnDescriptor::int("c3")],
        vec![
            vec![Value::from("abc"), Value::Float(0.123), Value::Int(0)],
            vec![Value::Missing, Value::Float(-2.34), Value::Int(1)],
            vec![Value::from("ABC"), Value::Float(0.0), Value::Int(2)],
            vec![Value::from("xyz"), Value::Null, Value::Int(3)],
            vec![Value::from("def"), Value::Float(0.131), Value::Int(4)],
            vec![Value::from("ghi"), Value::Missing, Value::Int(5)],
        ],
    )
}

fn column_as_i64(model: &TableModel, name: &str) -> Vec<i64> {
    model
        .column_values(name)
        .into_iter()
        .filter_map(Value::as_i64)
        .collect()
}

#[cfg(test)]
mod apply_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_in_filter_keeps_original_order() {
        let request = TableRequest::new("raw").with_filters("c1 IN ('abc','')");
        let page = apply_filter_sort_page(&create_test_table(), &request, &EngineConfig::default()).unwrap();
        assert_eq!(page.total_rows, 3);
        assert_eq!(column_as_i64(&page, "c3"), vec![0, 1, 2]);
        assert_eq!(page.status(), TableStatus::Complete);
    }

    #[test]
    fn test_sort_numeric_with_missing_values() {
        let config = EngineConfig::default();
        let asc = apply_filter_sort_page(&create_test_table(), &TableRequest::new("raw").with_sort("ASC,c2"), &config).unwrap();
        assert_eq!(column_as_i64(&asc, "c3"), vec![5, 3, 1, 2, 0, 4]);
        let desc = apply_filter_sort_page(&create_test_table(), &TableRequest::new("raw").with_sort("DESC,c2"), &config).unwrap();
        assert_eq!(column_as_i64(&desc, "c3"), vec![4, 0, 2, 1, 3, 5]);
    }

    #[test]
    fn test_row_idx_column_is_added_hidden() {
        let page = apply_filter_sort_page(
            &create_test_table(),
            &TableRequest::new("raw").with_sort("DESC,c3"),
            &EngineConfig::default(),
        )
        .unwrap();
        let col = page.column(ROW_IDX).unwrap();
        assert!(!col.is_visible());
        assert_eq!(column_as_i64(&page, ROW_IDX), vec![5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_no_row_idx_without_filter_or_sort() {
        let page = apply_filter_sort_page(
            &create_test_table(),
            &TableRequest::new("raw").with_page(2, 2),
            &EngineConfig::default(),
        )
        .unwrap();
        assert!(page.column(ROW_IDX).is_none());
        assert_eq!(column_as_i64(&page, "c3"), vec![2, 3]);
        assert_eq!(page.highlighted_row, 2);
        assert_eq!(page.page_start(), 2);
    }

    #[test]
    fn test_page_slice_and_requested_highlight() {
        let request = TableRequest::new("raw")
            .with_sort("ASC,c3")
            .with_page(0, 4)
            .with_highlighted_row(5);
        let page = apply_filter_sort_page(&create_test_table(), &request, &EngineConfig::default()).unwrap();
        assert_eq!(page.highlighted_row, 5);
        assert_eq!(page.request.start_idx, 4);
        assert_eq!(column_as_i64(&page, "c3"), vec![4, 5]);
        assert_eq!(page.total_rows, 6);
    }

    #[test]
    fn test_previous_highlight_is_preserved_by_row_idx() {
        let mut request = TableRequest::new("raw").with_sort("DESC,c3").with_page(0, 2);
        request.highlighted_row_by_row_idx = Some(1);
        let page = apply_filter_sort_page(&create_test_table(), &request, &EngineConfig::default()).unwrap();
        assert_eq!(page.highlighted_row, 4);
        assert_eq!(page.request.start_idx, 4);
        assert_eq!(page.row_idx_of(4), Some(1));
    }

    #[test]
    fn test_projection_keeps_row_idx() {
        let request = TableRequest::new("raw").with_filters("c3 > 3").with_incl_cols("c1");
        let page = apply_filter_sort_page(&create_test_table(), &request, &EngineConfig::default()).unwrap();
        let names: Vec<&str> = page.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["c1", ROW_IDX]);
        assert_eq!(page.rows, vec![
            vec![Value::from("def"), Value::Int(4)],
            vec![Value::from("ghi"), Value::Int(5)],
        ]);
    }

    #[test]
    fn test_selection_is_remapped_from_original() {
        let mut table = create_test_table();
        table.selection.set_row(4, true);
        table.selection.set_row(1, true);
        let page = apply_filter_sort_page(
            &table,
            &TableRequest::new("raw").with_sort("DESC,c3"),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(page.selection.row_count(), 6);
        assert_eq!(page.selection.all_selected_indices(), vec![1, 4]);
    }

    #[test]
    fn test_views_do_not_stack() {
        let config = EngineConfig::default();
        let first = apply_filter_sort_page(&create_test_table(), &TableRequest::new("raw").with_filters("c3 < 2"), &config).unwrap();
        assert!(first.is_client_table());
        let second = apply_filter_sort_page(&first, &TableRequest::new("raw").with_filters("c3 > 3"), &config).unwrap();
        assert_eq!(column_as_i64(&second, "c3"), vec![4, 5]);
        assert_eq!(second.original.as_ref().map(|o| o.rows.len()), Some(6));
        assert!(second.original.as_ref().is_some_and(|o| o.original.is_none()));
    }

    #[test]
    fn test_bad_filter_yields_error_state() {
        let request = TableRequest::new("raw").with_filters("c2 > abc");
        let page = apply_filter_sort_page(&create_test_table(), &request, &EngineConfig::default()).unwrap();
        assert_eq!(page.status(), TableStatus::Error);
        assert!(page.error.as_ref().is_some_and(|e| e.message.contains("invalid character value for cast")));
        assert!(page.is_client_table());
    }

    #[test]
    fn test_no_match_status() {
        let request = TableRequest::new("raw").with_filters("c3 > 100");
        let page = apply_filter_sort_page(&create_test_table(), &request, &EngineConfig::default()).unwrap();
        assert_eq!(page.status(), TableStatus::NoMatch);
        assert!(page.rows.is_empty());
    }

    #[test]
    fn test_start_past_filtered_total_lands_on_last_page() {
        let request = TableRequest::new("raw").with_filters("c3 >= 0").with_page(50, 10);
        let page = apply_filter_sort_page(&create_test_table(), &request, &EngineConfig::default()).unwrap();
        assert_eq!(page.total_rows, 6);
        assert_eq!(page.highlighted_row, 5);
        assert_eq!(page.page_start(), 0);
        assert_eq!(page.rows.len(), 6);

        let request = TableRequest::new("raw").with_filters("c3 > 1").with_page(8, 2);
        let page = apply_filter_sort_page(&create_test_table(), &request, &EngineConfig::default()).unwrap();
        assert_eq!(page.highlighted_row, 3);
        assert_eq!(page.page_start(), 2);
        assert_eq!(column_as_i64(&page, "c3"), vec![4, 5]);
    }

    #[test]
    fn test_empty_result_has_no_highlight_offset() {
        let request = TableRequest::new("raw").with_filters("c3 > 100").with_page(20, 10);
        let page = apply_filter_sort_page(&create_test_table(), &request, &EngineConfig::default()).unwrap();
        assert_eq!(page.highlighted_row, 0);
        assert_eq!(page.page_start(), 0);
    }

    #[test]
    fn test_view_row_positions_cover_every_page() {
        let config = EngineConfig::default();
        let request = TableRequest::new("raw").with_filters("c3 >= 1").with_sort("DESC,c3").with_page(0, 2);
        let view = apply_filter_sort_page(&create_test_table(), &request, &config).unwrap();
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view_row_positions(&view, &config).unwrap(), vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_partially_loaded_source_is_rejected() {
        let mut table = create_test_table();
        table.total_rows = 100;
        let result = apply_filter_sort_page(&table, &TableRequest::new("raw"), &EngineConfig::default());
        assert!(result.is_err());
    }
}

#[cfg(test)]
mod page_info_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn model_with(total: u64, highlighted: i64, page_size: i64) -> TableModel {
        let mut model = TableModel::new("t", vec![], vec![]);
        model.total_rows = total;
        model.highlighted_row = highlighted;
        model.request.page_size = page_size;
        model
    }

    #[test]
    fn test_page_info_basic() {
        let info = compute_page_info(&model_with(95, 42, 10), None, &EngineConfig::default());
        assert_eq!(info.current_page, 5);
        assert_eq!(info.hl_row_idx, 2);
        assert_eq!(info.start_idx, 40);
        assert_eq!(info.end_idx, 50);
        assert_eq!(info.total_pages, 10);
    }

    #[test]
    fn test_page_info_last_partial_page_and_clamp() {
        let info = compute_page_info(&model_with(95, 500, 10), None, &EngineConfig::default());
        assert_eq!(info.highlighted_row, 94);
        assert_eq!(info.start_idx, 90);
        assert_eq!(info.end_idx, 95);
        let info = compute_page_info(&model_with(95, -4, 10), None, &EngineConfig::default());
        assert_eq!(info.highlighted_row, 0);
        assert_eq!(info.current_page, 1);
    }

    #[test]
    fn test_page_size_override_and_fallback() {
        let info = compute_page_info(&model_with(95, 42, 10), Some(25), &EngineConfig::default());
        assert_eq!(info.current_page, 2);
        assert_eq!(info.total_pages, 4);
        let info = compute_page_info(&model_with(95, 42, 0), None, &EngineConfig::default());
        assert_eq!(info.page_size, tabula_core::MAX_ROW);
        assert_eq!(info.total_pages, 1);
    }

    #[test]
    fn test_page_info_empty_table() {
        let info = compute_page_info(&model_with(0, 0, 10), None, &EngineConfig::default());
        assert_eq!(info.current_page, 1);
        assert_eq!(info.end_idx, 0);
        assert_eq!(info.total_pages, 0);
    }
}

#[cfg(test)]
mod lookup_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_selected_rows() {
        let mut table = create_test_table();
        table.selection.set_row(3, true);
        table.selection.set_row(0, true);
        let selected = selected_rows(&table, &["c3", "c1"]);
        assert_eq!(selected.total_rows, 2);
        let names: Vec<&str> = selected.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["c3", "c1"]);
        assert_eq!(selected.rows[1], vec![Value::Int(3), Value::from("xyz")]);
    }

    #[test]
    fn test_find_loaded_index() {
        let table = create_test_table();
        let config = EngineConfig::default();
        assert_eq!(find_loaded_index(&table, "c1 = 'XYZ'", &config).unwrap(), Some(3));
        assert_eq!(find_loaded_index(&table, "c3 > 10", &config).unwrap(), None);
        assert!(find_loaded_index(&table, "nope = 1", &config).is_err());
    }
}
