mod test_reentrant_offer;
