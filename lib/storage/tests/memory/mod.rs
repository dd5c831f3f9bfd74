mod mem_triple_store;
