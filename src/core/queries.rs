use crate::domain::ports::GraphqlRequest;
use serde_json::{json, Value};
use std::collections::HashMap;

pub const ITEM_BY_ADDRESS_OPERATION: &str = "alphaNftItemByAddress";
pub const COLLECTION_SEARCH_OPERATION: &str = "nftSearch";

const SALE_FIELDS: &str = r#"
      sale {
        __typename
        ... on NftSaleFixPrice {
          address
          fullPrice
          networkFee
          currency
        }
        ... on NftSaleAuction {
          address
          networkFee
          marketplace
        }
        ... on TelemintAuction {
          marketplace
        }
      }"#;

fn item_by_address_document() -> String {
    format!(
        r#"query alphaNftItemByAddress($address: String!) {{
  alphaNftItemByAddress(address: $address) {{
    __typename
    address
    name
    kind{sale}
  }}
}}"#,
        sale = SALE_FIELDS
    )
}

fn collection_search_document() -> String {
    format!(
        r#"query nftSearch($query: String!, $count: Int!, $cursor: String) {{
  alphaNftItemSearch(query: $query, first: $count, after: $cursor) {{
    edges {{
      node {{
        __typename
        address
        name
        kind{sale}
      }}
    }}
  }}
}}"#,
        sale = SALE_FIELDS
    )
}

/// Point query for exactly one item.
pub fn item_by_address(address: &str, headers: &HashMap<String, String>) -> GraphqlRequest {
    GraphqlRequest {
        operation_name: ITEM_BY_ADDRESS_OPERATION.to_string(),
        query: item_by_address_document(),
        variables: json!({ "address": address }),
        headers: headers.clone(),
    }
}

/// First page of fixed-price listings of a collection.
pub fn collection_search(
    collection: &str,
    count: usize,
    headers: &HashMap<String, String>,
) -> GraphqlRequest {
    // 搜尋條件本身是一段 JSON 字串
    let filter = json!({
        "$and": [
            {"collectionAddress": collection},
            {"saleType": "fix_price"}
        ]
    });

    GraphqlRequest {
        operation_name: COLLECTION_SEARCH_OPERATION.to_string(),
        query: collection_search_document(),
        variables: json!({
            "query": filter.to_string(),
            "count": count,
            "cursor": Value::Null,
        }),
        headers: headers.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_by_address_request() {
        let request = item_by_address("EQabc", &HashMap::new());
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["operationName"], "alphaNftItemByAddress");
        assert_eq!(body["variables"]["address"], "EQabc");
        assert!(body["query"].as_str().unwrap().contains("networkFee"));
        assert!(body.get("headers").is_none());
    }

    #[test]
    fn test_collection_search_filter_is_a_json_string() {
        let request = collection_search("EQcollection", 100, &HashMap::new());

        let filter: Value =
            serde_json::from_str(request.variables["query"].as_str().unwrap()).unwrap();
        assert_eq!(filter["$and"][0]["collectionAddress"], "EQcollection");
        assert_eq!(filter["$and"][1]["saleType"], "fix_price");
        assert_eq!(request.variables["count"], 100);
        assert!(request.variables["cursor"].is_null());
        assert!(request.query.contains("alphaNftItemSearch"));
    }
}
