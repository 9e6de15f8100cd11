use proptest::prelude::*;
use xlsx_cursor::address::{MAX_COLUMNS, MAX_ROWS};
use xlsx_cursor::{CellAddress, cell_reference, column_name_to_index, index_to_column_name};

proptest! {
    #[test]
    fn column_index_round_trips(index in 1usize..=MAX_COLUMNS) {
        let name = index_to_column_name(index).unwrap();
        prop_assert!(name.len() <= 3);
        prop_assert!(name.bytes().all(|b| b.is_ascii_uppercase()));
        prop_assert_eq!(column_name_to_index(&name).unwrap(), index);
        prop_assert_eq!(column_name_to_index(&name.to_lowercase()).unwrap(), index);
    }

    #[test]
    fn column_names_round_trip(name in "[A-Z]{1,3}") {
        match column_name_to_index(&name) {
            Ok(index) => prop_assert_eq!(index_to_column_name(index).unwrap(), name),
            Err(_) => prop_assert!(name.len() == 3 && name.as_str() > "XFD"),
        }
    }

    #[test]
    fn references_parse_back(row in 1usize..=MAX_ROWS, column in 1usize..=MAX_COLUMNS) {
        let reference = cell_reference(row, column).unwrap();
        let address = CellAddress::parse(&reference).unwrap();
        prop_assert_eq!(address.row(), row);
        prop_assert_eq!(address.column(), column);
        prop_assert_eq!(address.to_string(), reference);
    }
}

#[test]
fn out_of_range_indices_are_rejected() {
    assert!(index_to_column_name(0).is_err());
    assert!(index_to_column_name(MAX_COLUMNS + 1).is_err());
    assert!(column_name_to_index("XFE").is_err());
    assert_eq!(cell_reference(5, MAX_COLUMNS).unwrap(), "XFD5");
}
